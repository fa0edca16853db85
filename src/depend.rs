//! Dependency resolution: is a field's validation precondition met?
//!
//! A field with a dependency binding is only validated when every condition
//! on its proxy fields holds (AND, short-circuiting in declaration order).
//! Conditions are memoized per pass under `(proxy, condition signature)` so
//! dependents sharing a condition pay for one evaluation. Proxies may
//! themselves depend on other proxies; resolution follows the chain and
//! aborts with a cycle error when it would revisit a field.

use tracing::trace;

use crate::types::{FieldValue, FormSet, FormState, PassContext, ValidateError};

/// Whether the field's preconditions are satisfied. Fields without a
/// dependency binding are always satisfied.
pub(crate) fn is_satisfied(
    form: &FormSet,
    field_idx: usize,
    state: &FormState,
    ctx: &mut PassContext,
) -> Result<bool, ValidateError> {
    let mut trail = Vec::new();
    check(form, field_idx, state, ctx, &mut trail)
}

fn check(
    form: &FormSet,
    idx: usize,
    state: &FormState,
    ctx: &mut PassContext,
    trail: &mut Vec<usize>,
) -> Result<bool, ValidateError> {
    if trail.contains(&idx) {
        let mut ids: Vec<String> = trail.iter().map(|&i| form.fields[i].id.clone()).collect();
        ids.push(form.fields[idx].id.clone());
        return Err(ValidateError::DependencyCycle { trail: ids });
    }

    let Some(binding) = &form.fields[idx].dependency else {
        return Ok(true);
    };

    trail.push(idx);
    let mut satisfied = true;
    for cond in &binding.conditions {
        let result = match ctx.cached_condition(&cond.proxy, &cond.signature) {
            Some(cached) => {
                trace!(proxy = %cond.proxy, signature = %cond.signature, cached, "condition cache hit");
                cached
            }
            None => {
                let mut result = true;
                // A proxy that itself depends on other fields must have its
                // own chain satisfied before its value means anything.
                if let Some(proxy_idx) = proxy_with_binding(form, &cond.proxy) {
                    result = check(form, proxy_idx, state, ctx, trail)?;
                }
                if result {
                    ctx.record_evaluation();
                    let values = proxy_values(form, state, &cond.proxy);
                    result = cond.expected.matches(&values);
                }
                ctx.cache_condition(&cond.proxy, &cond.signature, result);
                result
            }
        };
        if !result {
            satisfied = false;
            break;
        }
    }
    trail.pop();
    Ok(satisfied)
}

/// First field of the proxy's group that carries its own dependency binding.
fn proxy_with_binding(form: &FormSet, proxy: &str) -> Option<usize> {
    form.groups
        .get(proxy)?
        .iter()
        .copied()
        .find(|&i| form.fields[i].dependency.is_some())
}

/// The proxy's current value, merged across every field sharing its group
/// name (radio and checkbox groups spread one logical value over several
/// controls). A proxy that resolves to no field yields no values, which
/// meets no condition.
fn proxy_values(form: &FormSet, state: &FormState, proxy: &str) -> Vec<String> {
    let mut values = Vec::new();
    if let Some(members) = form.groups.get(proxy) {
        for &i in members {
            match state.get(&form.fields[i].id) {
                Some(FieldValue::Text(s)) => values.push(s.clone()),
                Some(FieldValue::Selected(sel)) => values.extend(sel.iter().cloned()),
                Some(FieldValue::Parts(parts)) => values.extend(parts.iter().flatten().cloned()),
                Some(FieldValue::File(Some(info))) => values.push(info.file_name.clone()),
                _ => {}
            }
        }
    }
    values
}

/// React to a proxy's value change outside a validation pass: recompute
/// satisfaction for every dependent field and fire declared callbacks with
/// `(satisfied, args)`. Uses a scratch context so the notification always
/// sees live values, never a previous pass's cache.
pub(crate) fn proxy_changed(
    form: &FormSet,
    proxy: &str,
    state: &FormState,
) -> Result<(), ValidateError> {
    let Some(entry) = form.proxies.get(proxy) else {
        return Ok(());
    };
    let mut scratch = PassContext::new();
    for &dep in &entry.dependents {
        let satisfied = is_satisfied(form, dep, state, &mut scratch)?;
        let field = &form.fields[dep];
        trace!(field = %field.id, satisfied, "dependency recomputed after proxy change");
        if let Some(callback) = field.dependency.as_ref().and_then(|b| b.callback.as_ref()) {
            (form.callbacks[callback.function])(satisfied, &callback.args);
        }
    }
    Ok(())
}
