//! Parameter-grid expansion
//!
//! A grid is a nested mapping `{group: {param: spec}}` where a spec is a
//! scalar, a mapping of named alternatives, or a `{from, to, step}` range.
//! Expansion takes the cross product of the leaf value-sets within each
//! group, then the cross product across groups. Input that is not exactly
//! three levels deep is treated as a single implicit group.

use crate::errors::CombineError;
use blockflow_logger as logger;
use blockflow_schema::Value;
use rand::Rng;
use serde_json::Map;

/// Expands parameter grids into concrete combinations.
///
/// When `randomize_seeds` is set, every combination gets each of its `seed`
/// fields (searched recursively through nested mappings) overwritten with an
/// independently drawn random integer. This happens unconditionally, even
/// when the grid spelled out an explicit seed spec: the random draw wins.
/// That override is intentional and matches the host's random-seed mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridExpander {
    pub randomize_seeds: bool,
}

impl GridExpander {
    pub fn new(randomize_seeds: bool) -> Self {
        GridExpander { randomize_seeds }
    }

    /// Expand a nested parameter spec into the list of concrete combinations
    pub fn expand(&self, params: &Value) -> Result<Vec<Value>, CombineError> {
        let mut rng = rand::thread_rng();
        self.expand_with(params, &mut rng)
    }

    /// Expansion with an explicit random source, for deterministic callers
    pub fn expand_with<R: Rng>(
        &self,
        params: &Value,
        rng: &mut R,
    ) -> Result<Vec<Value>, CombineError> {
        let three_level = depth(params) == 3;
        let groups: Map<String, Value> = if three_level {
            params
                .as_object()
                .cloned()
                .ok_or_else(|| CombineError::MalformedSpec("grid must be a mapping".to_string()))?
        } else {
            let mut wrapped = Map::new();
            wrapped.insert("tmp".to_string(), params.clone());
            wrapped
        };

        let mut group_names = Vec::with_capacity(groups.len());
        let mut group_combos = Vec::with_capacity(groups.len());
        for (name, group_params) in &groups {
            group_names.push(name.clone());
            group_combos.push(expand_group(group_params)?);
        }

        let mut combinations: Vec<Value> = cartesian(&group_combos)
            .into_iter()
            .map(|per_group| {
                let mut combo = Map::new();
                for (name, group_values) in group_names.iter().zip(per_group) {
                    combo.insert(name.clone(), Value::Object(group_values));
                }
                Value::Object(combo)
            })
            .collect();

        if self.randomize_seeds {
            for combo in &mut combinations {
                // Matches the host's random-seed mode: an independent draw
                // per combination, below 2^32 - 2.
                let seed = rng.gen_range(0..u64::from(u32::MAX) - 1);
                replace_seed_fields(combo, seed);
            }
        }

        let combinations = if three_level {
            combinations
        } else {
            combinations
                .into_iter()
                .filter_map(|mut combo| {
                    combo
                        .as_object_mut()
                        .and_then(|obj| obj.remove("tmp"))
                })
                .collect()
        };

        logger::debug(&format!(
            "grid expansion produced {} combinations",
            combinations.len()
        ));
        Ok(combinations)
    }
}

/// Expand one group's `{param: spec}` mapping into the cross product of its
/// leaf value-sets
fn expand_group(group: &Value) -> Result<Vec<Map<String, Value>>, CombineError> {
    let obj = group
        .as_object()
        .ok_or_else(|| CombineError::MalformedSpec("group must be a mapping of specs".to_string()))?;

    let mut keys = Vec::with_capacity(obj.len());
    let mut value_sets = Vec::with_capacity(obj.len());
    for (key, spec) in obj {
        keys.push(key.clone());
        value_sets.push(spec_values(spec)?);
    }

    Ok(cartesian(&value_sets)
        .into_iter()
        .map(|values| keys.iter().cloned().zip(values).collect())
        .collect())
}

/// Compute the value set of a single leaf spec: a range descriptor expands
/// to an inclusive arithmetic sequence, a mapping of alternatives to its
/// de-duplicated values, anything else to a singleton
fn spec_values(spec: &Value) -> Result<Vec<Value>, CombineError> {
    if let Some(obj) = spec.as_object() {
        if obj.contains_key("from") && obj.contains_key("to") && obj.contains_key("step") {
            return range_values(obj);
        }
        let mut values: Vec<Value> = Vec::with_capacity(obj.len());
        for value in obj.values() {
            if !values.contains(value) {
                values.push(value.clone());
            }
        }
        return Ok(values);
    }
    Ok(vec![spec.clone()])
}

/// Expand `{from, to, step}` to the inclusive sequence from `from` to `to`.
/// Integer bounds step exactly; float bounds absorb accumulation error with
/// a half-step tolerance so the endpoint is still included.
fn range_values(obj: &Map<String, Value>) -> Result<Vec<Value>, CombineError> {
    let bound = |key: &str| -> Result<&Value, CombineError> {
        obj.get(key)
            .filter(|v| v.is_number())
            .ok_or_else(|| CombineError::MalformedSpec(format!("range field '{}' must be a number", key)))
    };
    let from = bound("from")?;
    let to = bound("to")?;
    let step = bound("step")?;

    if let (Some(from), Some(to), Some(step)) = (from.as_i64(), to.as_i64(), step.as_i64()) {
        if step == 0 {
            return Err(CombineError::MalformedSpec("range step must be non-zero".to_string()));
        }
        let mut values = Vec::new();
        let mut current = from;
        while (step > 0 && current <= to) || (step < 0 && current >= to) {
            values.push(Value::from(current));
            current += step;
        }
        return Ok(values);
    }

    let from = from.as_f64().unwrap_or(0.0);
    let to = to.as_f64().unwrap_or(0.0);
    let step = step.as_f64().unwrap_or(0.0);
    if step == 0.0 || !step.is_finite() {
        return Err(CombineError::MalformedSpec("range step must be non-zero".to_string()));
    }

    let limit = to + step / 2.0;
    let mut values = Vec::new();
    let mut current = from;
    while (step > 0.0 && current < limit) || (step < 0.0 && current > limit) {
        values.push(Value::from(current));
        current += step;
    }
    Ok(values)
}

/// Mapping/sequence nesting depth; scalars are depth 0
fn depth(value: &Value) -> usize {
    match value {
        Value::Object(obj) if !obj.is_empty() => {
            1 + obj.values().map(depth).max().unwrap_or(0)
        }
        Value::Array(arr) if !arr.is_empty() => 1 + arr.iter().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Overwrite every `seed` field reachable through nested mappings
fn replace_seed_fields(value: &mut Value, seed: u64) {
    if let Some(obj) = value.as_object_mut() {
        for nested in obj.values_mut() {
            if nested.is_object() {
                replace_seed_fields(nested, seed);
            }
        }
        if let Some(entry) = obj.get_mut("seed") {
            *entry = Value::from(seed);
        }
    }
}

/// Cross product of value sets; an empty set yields no combinations
fn cartesian<T: Clone>(sets: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut result: Vec<Vec<T>> = vec![Vec::new()];
    for set in sets {
        let mut next = Vec::with_capacity(result.len() * set.len());
        for combo in &result {
            for item in set {
                let mut extended = combo.clone();
                extended.push(item.clone());
                next.push(extended);
            }
        }
        result = next;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expand(params: Value) -> Vec<Value> {
        GridExpander::new(false).expand(&params).unwrap()
    }

    #[test]
    fn float_range_includes_endpoint() {
        let values = spec_values(&json!({"from": 0, "to": 1, "step": 0.5})).unwrap();
        assert_eq!(values, vec![json!(0.0), json!(0.5), json!(1.0)]);
    }

    #[test]
    fn integer_range_is_inclusive() {
        let values = spec_values(&json!({"from": 0, "to": 2, "step": 1})).unwrap();
        assert_eq!(values, vec![json!(0), json!(1), json!(2)]);
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(spec_values(&json!({"from": 0, "to": 2, "step": 0})).is_err());
    }

    #[test]
    fn alternatives_are_deduplicated() {
        let values = spec_values(&json!({"a": 1, "b": 2, "c": 1})).unwrap();
        assert_eq!(values, vec![json!(1), json!(2)]);
    }

    #[test]
    fn scalar_is_a_singleton() {
        assert_eq!(spec_values(&json!(7)).unwrap(), vec![json!(7)]);
    }

    #[test]
    fn implicit_group_expands_flat_params() {
        let combos = expand(json!({"x": {"from": 0, "to": 2, "step": 1}}));
        assert_eq!(
            combos,
            vec![json!({"x": 0}), json!({"x": 1}), json!({"x": 2})]
        );
    }

    #[test]
    fn three_level_grid_crosses_groups() {
        let combos = expand(json!({
            "model": {"layers": {"from": 1, "to": 2, "step": 1}},
            "train": {"lr": {"slow": 0.01, "fast": 0.1}},
        }));

        assert_eq!(combos.len(), 4);
        for combo in &combos {
            assert!(combo["model"]["layers"].is_number());
            assert!(combo["train"]["lr"].is_number());
        }
    }

    #[test]
    fn cross_product_within_group() {
        let combos = expand(json!({
            "x": {"from": 0, "to": 1, "step": 1},
            "y": {"a": "p", "b": "q"},
        }));
        assert_eq!(combos.len(), 4);
    }

    #[test]
    fn randomize_overwrites_explicit_seed_spec() {
        use rand::rngs::mock::StepRng;

        let expander = GridExpander::new(true);
        let mut rng = StepRng::new(u64::MAX / 2, 1);
        let combos = expander
            .expand_with(&json!({"seed": {"from": 0, "to": 1, "step": 1}}), &mut rng)
            .unwrap();

        assert_eq!(combos.len(), 2);
        // The explicit seed grid asked for 0 and 1; the randomize mode wins.
        for combo in &combos {
            let seed = combo["seed"].as_u64().unwrap();
            assert!(seed > 1);
        }
    }

    #[test]
    fn randomize_reaches_nested_seed_fields() {
        use rand::rngs::mock::StepRng;

        let expander = GridExpander::new(true);
        let mut rng = StepRng::new(u64::MAX / 2, 1);
        let combos = expander
            .expand_with(
                &json!({"run": {"seed": 0, "width": {"from": 1, "to": 2, "step": 1}}}),
                &mut rng,
            )
            .unwrap();

        assert_eq!(combos.len(), 2);
        for combo in &combos {
            assert!(combo["run"]["seed"].as_u64().unwrap() > 1);
        }
    }
}
