//! Data-source combination
//!
//! Fans a function out over one or more data sources and parameter grids.
//! Sources sharing a non-zero zip flag are paired positionally (equal
//! lengths required); the rest participate in a cross product. The zipped
//! groups and the cross-product group are then cross-multiplied and
//! reassembled in the original source order, and the result is zipped with
//! or crossed against the parameter grids. Every produced result carries a
//! provenance mapping recording which source and grid values fed it.

use crate::errors::CombineError;
use blockflow_logger as logger;
use blockflow_schema::{ArgMap, ParamSpec, Value};
use serde::{Deserialize, Serialize};

/// One data element together with the provenance of the values that
/// produced it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataItem {
    pub provenance: ArgMap,
    pub value: Value,
}

impl DataItem {
    /// A bare value with empty provenance
    pub fn bare(value: Value) -> Self {
        DataItem {
            provenance: ArgMap::new(),
            value,
        }
    }

    /// Serialize back to the wire form consumed by downstream stages:
    /// a `[provenance, value]` pair
    pub fn into_value(self) -> Value {
        Value::Array(vec![Value::Object(self.provenance), self.value])
    }
}

/// Normalize a raw source list into provenance/value pairs. A source whose
/// elements are all `[provenance, value]` pairs keeps them; anything else is
/// treated as a list of bare values.
pub fn normalize_source(items: &[Value]) -> Vec<DataItem> {
    let all_pairs = !items.is_empty()
        && items.iter().all(|item| {
            item.as_array()
                .is_some_and(|pair| pair.len() == 2 && pair[0].is_object())
        });

    if all_pairs {
        items
            .iter()
            .filter_map(|item| {
                let pair = item.as_array()?;
                Some(DataItem {
                    provenance: pair[0].as_object().cloned().unwrap_or_default(),
                    value: pair[1].clone(),
                })
            })
            .collect()
    } else {
        items.iter().cloned().map(DataItem::bare).collect()
    }
}

/// Configuration of one combination pass, captured at construction and
/// immutable afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineSpec {
    /// Names of the function parameters bound to data sources, in source
    /// order
    pub data_params: Vec<String>,
    /// One flag per source; sources sharing a non-zero flag are zipped
    /// together, flag 0 means cross product
    #[serde(default)]
    pub zip_flags: Vec<u32>,
    /// Zip the data combinations with the parameter grids positionally
    /// instead of crossing them
    #[serde(default)]
    pub zip_with_params: bool,
    /// Record the grid parameters in each result's provenance, suffixed by
    /// the function name
    #[serde(default = "default_true")]
    pub record_params: bool,
    /// Fold each result back into its provenance under the function's name,
    /// so chained combination calls can reference prior stage outputs
    #[serde(default)]
    pub record_result: bool,
    /// Override for the function-name suffix used in provenance keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

fn default_true() -> bool {
    true
}

impl CombineSpec {
    pub fn new(data_params: Vec<String>) -> Self {
        let zip_flags = vec![0; data_params.len()];
        CombineSpec {
            data_params,
            zip_flags,
            zip_with_params: false,
            record_params: true,
            record_result: false,
            suffix: None,
        }
    }

    /// Zip all sources together (or cross them all)
    pub fn zip_all(mut self, zip: bool) -> Self {
        self.zip_flags = vec![u32::from(zip); self.data_params.len()];
        self
    }

    pub fn zip_flags(mut self, flags: Vec<u32>) -> Self {
        self.zip_flags = flags;
        self
    }

    pub fn zip_with_params(mut self, zip: bool) -> Self {
        self.zip_with_params = zip;
        self
    }

    pub fn record_result(mut self, record: bool) -> Self {
        self.record_result = record;
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }
}

/// Combine data sources and parameter grids and invoke `func` once per final
/// combination.
///
/// `inner_params` is the declared parameter list of the function being
/// fanned out; parameters that are neither data-bound nor present in a grid
/// entry are filled from their declared defaults. `func_name` suffixes the
/// grid-parameter provenance keys (overridden by the spec's `suffix`).
pub fn combine(
    spec: &CombineSpec,
    inner_params: &[ParamSpec],
    func_name: &str,
    sources: &[Vec<Value>],
    grids: &[ArgMap],
    func: &mut dyn FnMut(&ArgMap) -> anyhow::Result<Value>,
) -> Result<Vec<DataItem>, CombineError> {
    if sources.len() != spec.data_params.len() {
        return Err(CombineError::MalformedSpec(format!(
            "{} data sources supplied for {} declared data parameters",
            sources.len(),
            spec.data_params.len()
        )));
    }
    let zip_flags: Vec<u32> = if spec.zip_flags.is_empty() {
        vec![0; sources.len()]
    } else if spec.zip_flags.len() == sources.len() {
        spec.zip_flags.clone()
    } else {
        return Err(CombineError::MalformedSpec(format!(
            "{} zip flags supplied for {} data sources",
            spec.zip_flags.len(),
            sources.len()
        )));
    };

    let normalized: Vec<Vec<DataItem>> = sources.iter().map(|s| normalize_source(s)).collect();
    let data_combinations = combine_sources(&normalized, &zip_flags)?;

    let grid_entries = fill_grid_defaults(spec, inner_params, grids)?;
    let func_name = spec.suffix.as_deref().unwrap_or(func_name);

    let pairs: Vec<(&Vec<DataItem>, &ArgMap)> = if spec.zip_with_params {
        if data_combinations.len() != grid_entries.len() {
            return Err(CombineError::LengthMismatch {
                expected: data_combinations.len(),
                got: grid_entries.len(),
            });
        }
        data_combinations.iter().zip(grid_entries.iter()).collect()
    } else {
        data_combinations
            .iter()
            .flat_map(|combo| grid_entries.iter().map(move |entry| (combo, entry)))
            .collect()
    };

    logger::debug(&format!(
        "combining {} data combinations with {} grid entries for '{}' ({} calls)",
        data_combinations.len(),
        grid_entries.len(),
        func_name,
        pairs.len()
    ));

    let mut results = Vec::with_capacity(pairs.len());
    for (data_set, grid_entry) in pairs {
        let mut provenance = ArgMap::new();
        let mut args = ArgMap::new();

        for (item, param_name) in data_set.iter().zip(&spec.data_params) {
            for (key, value) in &item.provenance {
                provenance.insert(format!("{}_{}", key, param_name), value.clone());
            }
            args.insert(param_name.clone(), item.value.clone());
        }

        for (key, value) in grid_entry {
            if spec.record_params {
                provenance.insert(format!("{}_{}", key, func_name), value.clone());
            }
            args.insert(key.clone(), value.clone());
        }

        let value = func(&args).map_err(CombineError::Compute)?;
        if spec.record_result {
            provenance.insert(func_name.to_string(), value.clone());
        }
        results.push(DataItem { provenance, value });
    }

    Ok(results)
}

/// Partition sources by zip flag, zip/cross within each partition, cross the
/// partitions together and reassemble each combination in source order
fn combine_sources(
    sources: &[Vec<DataItem>],
    zip_flags: &[u32],
) -> Result<Vec<Vec<DataItem>>, CombineError> {
    // Partitions keyed by flag, in order of first appearance
    let mut partitions: Vec<(u32, Vec<usize>)> = Vec::new();
    for (idx, flag) in zip_flags.iter().enumerate() {
        match partitions.iter_mut().find(|(f, _)| f == flag) {
            Some((_, members)) => members.push(idx),
            None => partitions.push((*flag, vec![idx])),
        }
    }

    // Each partition yields a list of partial combinations, every partial
    // combination tagged with the source index it came from
    let mut partition_combos: Vec<Vec<Vec<(usize, DataItem)>>> = Vec::new();
    for (flag, members) in &partitions {
        if *flag == 0 {
            let sets: Vec<Vec<(usize, DataItem)>> = members
                .iter()
                .map(|&idx| {
                    sources[idx]
                        .iter()
                        .map(|item| (idx, item.clone()))
                        .collect()
                })
                .collect();
            partition_combos.push(cross(&sets));
        } else {
            partition_combos.push(zip_members(sources, members)?);
        }
    }

    // Cross product across partitions, then restore original source order
    let combined = cross_nested(&partition_combos);
    Ok(combined
        .into_iter()
        .map(|mut tagged| {
            tagged.sort_by_key(|(idx, _)| *idx);
            tagged.into_iter().map(|(_, item)| item).collect()
        })
        .collect())
}

/// Zip the member sources of one partition positionally; all must share one
/// length
fn zip_members(
    sources: &[Vec<DataItem>],
    members: &[usize],
) -> Result<Vec<Vec<(usize, DataItem)>>, CombineError> {
    let expected = members.first().map_or(0, |&idx| sources[idx].len());
    for &idx in members {
        if sources[idx].len() != expected {
            return Err(CombineError::LengthMismatch {
                expected,
                got: sources[idx].len(),
            });
        }
    }

    Ok((0..expected)
        .map(|pos| {
            members
                .iter()
                .map(|&idx| (idx, sources[idx][pos].clone()))
                .collect()
        })
        .collect())
}

/// Cross product of per-source item lists into flat combinations
fn cross(sets: &[Vec<(usize, DataItem)>]) -> Vec<Vec<(usize, DataItem)>> {
    let mut result: Vec<Vec<(usize, DataItem)>> = vec![Vec::new()];
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

/// Cross product across partitions, concatenating their partial combinations
fn cross_nested(partitions: &[Vec<Vec<(usize, DataItem)>>]) -> Vec<Vec<(usize, DataItem)>> {
    let mut result: Vec<Vec<(usize, DataItem)>> = vec![Vec::new()];
    for partition in partitions {
        let mut next = Vec::with_capacity(result.len() * partition.len());
        for combo in &result {
            for partial in partition {
                let mut extended = combo.clone();
                extended.extend(partial.iter().cloned());
                next.push(extended);
            }
        }
        result = next;
    }
    result
}

/// Fill each grid entry with declared defaults for parameters it does not
/// set; a required parameter missing from an entry is an error
fn fill_grid_defaults(
    spec: &CombineSpec,
    inner_params: &[ParamSpec],
    grids: &[ArgMap],
) -> Result<Vec<ArgMap>, CombineError> {
    let empty = vec![ArgMap::new()];
    let grids = if grids.is_empty() { &empty } else { grids };

    let non_data: Vec<&ParamSpec> = inner_params
        .iter()
        .filter(|p| !p.variadic && !spec.data_params.iter().any(|d| d == p.name.as_ref()))
        .collect();

    let mut filled = Vec::with_capacity(grids.len());
    for entry in grids {
        let mut entry = entry.clone();
        for param in &non_data {
            if entry.contains_key(param.name.as_ref()) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    entry.insert(param.name.to_string(), default.clone());
                }
                None => {
                    return Err(CombineError::MissingParameter(param.name.to_string()));
                }
            }
        }
        filled.push(entry);
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockflow_schema::ValueType;
    use serde_json::json;

    fn params(names: &[&str]) -> Vec<ParamSpec> {
        names
            .iter()
            .map(|name| ParamSpec::new(name, ValueType::Any))
            .collect()
    }

    fn grid(entries: &[Value]) -> Vec<ArgMap> {
        entries
            .iter()
            .filter_map(|e| e.as_object().cloned())
            .collect()
    }

    #[test]
    fn zip_sources_of_unequal_length_fail_fast() {
        let spec = CombineSpec::new(vec!["a".to_string(), "b".to_string()]).zip_all(true);
        let sources = vec![
            vec![json!(1), json!(2), json!(3)],
            vec![json!(10), json!(20), json!(30), json!(40)],
        ];

        let err = combine(
            &spec,
            &params(&["a", "b"]),
            "f",
            &sources,
            &[],
            &mut |_| Ok(Value::Null),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CombineError::LengthMismatch { expected: 3, got: 4 }
        ));
    }

    #[test]
    fn cross_product_cardinality() {
        // Two non-zipped sources of lengths 2 and 3, one grid of 2 entries,
        // cross product mode: 2 * 3 * 2 = 12 results.
        let spec = CombineSpec::new(vec!["a".to_string(), "b".to_string()]);
        let sources = vec![
            vec![json!(1), json!(2)],
            vec![json!(10), json!(20), json!(30)],
        ];
        let grids = grid(&[json!({"p": 1}), json!({"p": 2})]);

        let results = combine(
            &spec,
            &params(&["a", "b", "p"]),
            "f",
            &sources,
            &grids,
            &mut |args| {
                let a = args["a"].as_i64().unwrap_or(0);
                let b = args["b"].as_i64().unwrap_or(0);
                let p = args["p"].as_i64().unwrap_or(0);
                Ok(json!(a + b + p))
            },
        )
        .unwrap();
        assert_eq!(results.len(), 12);
    }

    #[test]
    fn zip_pairs_positionally() {
        let spec = CombineSpec::new(vec!["a".to_string(), "b".to_string()]).zip_all(true);
        let sources = vec![vec![json!(1), json!(2)], vec![json!(10), json!(20)]];

        let results = combine(
            &spec,
            &params(&["a", "b"]),
            "add",
            &sources,
            &[],
            &mut |args| {
                let a = args["a"].as_i64().unwrap_or(0);
                let b = args["b"].as_i64().unwrap_or(0);
                Ok(json!(a + b))
            },
        )
        .unwrap();

        let values: Vec<i64> = results.iter().filter_map(|r| r.value.as_i64()).collect();
        assert_eq!(values, [11, 22]);
    }

    #[test]
    fn mixed_zip_and_cross_partitions_keep_source_order() {
        // Sources a and c share zip flag 1; b is crossed in between them.
        let spec = CombineSpec::new(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .zip_flags(vec![1, 0, 1]);
        let sources = vec![
            vec![json!(1), json!(2)],
            vec![json!("x"), json!("y")],
            vec![json!(10), json!(20)],
        ];

        let results = combine(
            &spec,
            &params(&["a", "b", "c"]),
            "f",
            &sources,
            &[],
            &mut |args| Ok(json!([args["a"], args["b"], args["c"]])),
        )
        .unwrap();

        // 2 zipped pairs * 2 crossed values
        assert_eq!(results.len(), 4);
        for result in &results {
            let triple = result.value.as_array().unwrap();
            // Zipped sources stay aligned: (1, 10) and (2, 20)
            let a = triple[0].as_i64().unwrap();
            let c = triple[2].as_i64().unwrap();
            assert_eq!(c, a * 10);
            assert!(triple[1].is_string());
        }
    }

    #[test]
    fn provenance_accumulates_source_and_grid_values() {
        let spec = CombineSpec::new(vec!["data".to_string()]);
        let sources = vec![vec![
            json!([{"origin": "run1"}, 10]),
            json!([{"origin": "run2"}, 20]),
        ]];
        let grids = grid(&[json!({"x": 1})]);

        let results = combine(
            &spec,
            &params(&["data", "x"]),
            "scale",
            &sources,
            &grids,
            &mut |args| {
                let d = args["data"].as_i64().unwrap_or(0);
                let x = args["x"].as_i64().unwrap_or(0);
                Ok(json!(d * x))
            },
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].provenance["origin_data"], json!("run1"));
        assert_eq!(results[0].provenance["x_scale"], json!(1));
        assert_eq!(results[1].provenance["origin_data"], json!("run2"));
    }

    #[test]
    fn suffix_overrides_provenance_function_name() {
        let spec = CombineSpec::new(vec!["data".to_string()]).suffix("stage2");
        let sources = vec![vec![json!(5)]];
        let grids = grid(&[json!({"x": 3})]);

        let results = combine(
            &spec,
            &params(&["data", "x"]),
            "ignored",
            &sources,
            &grids,
            &mut |_| Ok(Value::Null),
        )
        .unwrap();
        assert!(results[0].provenance.contains_key("x_stage2"));
    }

    #[test]
    fn record_result_folds_value_into_provenance() {
        let spec = CombineSpec::new(vec!["data".to_string()]).record_result(true);
        let sources = vec![vec![json!(2)]];

        let results = combine(
            &spec,
            &params(&["data"]),
            "double",
            &sources,
            &[],
            &mut |args| Ok(json!(args["data"].as_i64().unwrap_or(0) * 2)),
        )
        .unwrap();
        assert_eq!(results[0].provenance["double"], json!(4));
        assert_eq!(results[0].value, json!(4));
    }

    #[test]
    fn missing_required_parameter_is_an_error() {
        let spec = CombineSpec::new(vec!["data".to_string()]);
        let sources = vec![vec![json!(1)]];
        let inner = params(&["data", "threshold"]);

        let err = combine(&spec, &inner, "f", &sources, &[], &mut |_| Ok(Value::Null))
            .unwrap_err();
        assert!(matches!(err, CombineError::MissingParameter(name) if name == "threshold"));
    }

    #[test]
    fn defaults_fill_missing_grid_parameters() {
        let spec = CombineSpec::new(vec!["data".to_string()]);
        let sources = vec![vec![json!(1)]];
        let inner = vec![
            ParamSpec::new("data", ValueType::Any),
            ParamSpec::with_default("offset", ValueType::Int, json!(100)),
        ];

        let results = combine(&spec, &inner, "f", &sources, &[], &mut |args| {
            Ok(json!(
                args["data"].as_i64().unwrap_or(0) + args["offset"].as_i64().unwrap_or(0)
            ))
        })
        .unwrap();
        assert_eq!(results[0].value, json!(101));
    }

    #[test]
    fn zip_with_params_requires_equal_cardinality() {
        let spec = CombineSpec::new(vec!["data".to_string()]).zip_with_params(true);
        let sources = vec![vec![json!(1), json!(2)]];
        let grids = grid(&[json!({"x": 1}), json!({"x": 2}), json!({"x": 3})]);

        let err = combine(
            &spec,
            &params(&["data", "x"]),
            "f",
            &sources,
            &grids,
            &mut |_| Ok(Value::Null),
        )
        .unwrap_err();
        assert!(matches!(err, CombineError::LengthMismatch { .. }));
    }

    #[test]
    fn compute_failure_surfaces_as_compute_error() {
        let spec = CombineSpec::new(vec!["data".to_string()]);
        let sources = vec![vec![json!(1)]];

        let err = combine(
            &spec,
            &params(&["data"]),
            "f",
            &sources,
            &[],
            &mut |_| anyhow::bail!("boom"),
        )
        .unwrap_err();
        assert!(matches!(err, CombineError::Compute(_)));
    }
}
