//! Wave plan construction by iterative topological layering.

use crate::errors::PidlError;
use std::collections::HashSet;

/// An execution plan: waves of task names, run wave-by-wave.
pub type WavePlan = Vec<Vec<String>>;

/// Layers `(name, prerequisites)` entries into waves.
///
/// Starting from an empty seen set, each iteration collects every unseen
/// task whose prerequisites are all seen, splits the batch into sub-waves
/// of at most `concurrency` tasks (one sub-wave when `concurrency` is 0),
/// and marks the batch seen. Ordering within a wave is entry order, which
/// callers supply as pipeline insertion order.
///
/// # Errors
///
/// Returns `UnreachableTasks` when the fixed point leaves tasks uncovered:
/// their prerequisites are missing or cyclic.
pub(crate) fn layer_waves(
    entries: &[(String, Vec<String>)],
    concurrency: usize,
) -> Result<WavePlan, PidlError> {
    let mut plan: WavePlan = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    loop {
        let ready: Vec<String> = entries
            .iter()
            .filter(|(name, prereqs)| {
                !seen.contains(name) && prereqs.iter().all(|p| seen.contains(p))
            })
            .map(|(name, _)| name.clone())
            .collect();

        if ready.is_empty() {
            break;
        }

        seen.extend(ready.iter().cloned());
        if concurrency == 0 {
            plan.push(ready);
        } else {
            for chunk in ready.chunks(concurrency) {
                plan.push(chunk.to_vec());
            }
        }
    }

    let unreachable: Vec<String> = entries
        .iter()
        .filter(|(name, _)| !seen.contains(name))
        .map(|(name, _)| name.clone())
        .collect();
    if !unreachable.is_empty() {
        return Err(PidlError::UnreachableTasks { names: unreachable });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, prereqs: &[&str]) -> (String, Vec<String>) {
        (
            name.to_string(),
            prereqs.iter().map(|p| (*p).to_string()).collect(),
        )
    }

    fn wave(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_empty_plan() {
        assert_eq!(layer_waves(&[], 0).unwrap(), WavePlan::new());
    }

    #[test]
    fn test_diamond_layering() {
        let entries = [
            entry("a", &[]),
            entry("b", &["a"]),
            entry("c", &["a"]),
            entry("d", &["b", "c"]),
        ];
        let plan = layer_waves(&entries, 0).unwrap();
        assert_eq!(plan, vec![wave(&["a"]), wave(&["b", "c"]), wave(&["d"])]);
    }

    #[test]
    fn test_wave_order_is_insertion_order() {
        let entries = [entry("z", &[]), entry("a", &[]), entry("m", &[])];
        let plan = layer_waves(&entries, 0).unwrap();
        assert_eq!(plan, vec![wave(&["z", "a", "m"])]);
    }

    #[test]
    fn test_concurrency_splits_waves() {
        let entries = [
            entry("a", &[]),
            entry("b", &[]),
            entry("c", &[]),
            entry("d", &[]),
        ];
        let plan = layer_waves(&entries, 3).unwrap();
        assert_eq!(plan, vec![wave(&["a", "b", "c"]), wave(&["d"])]);
    }

    #[test]
    fn test_concurrency_zero_never_splits() {
        let entries: Vec<_> = (0..20).map(|i| entry(&format!("t{i}"), &[])).collect();
        let plan = layer_waves(&entries, 0).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].len(), 20);
    }

    #[test]
    fn test_every_wave_within_cap() {
        let entries = [
            entry("a", &[]),
            entry("b", &[]),
            entry("c", &[]),
            entry("d", &["a"]),
            entry("e", &["a"]),
            entry("f", &["a"]),
        ];
        let plan = layer_waves(&entries, 2).unwrap();
        for w in &plan {
            assert!(w.len() <= 2);
        }
        let all: Vec<String> = plan.into_iter().flatten().collect();
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn test_cycle_is_unreachable() {
        let entries = [entry("p", &["q"]), entry("q", &["p"])];
        let err = layer_waves(&entries, 0).unwrap_err();
        assert_eq!(
            err,
            PidlError::UnreachableTasks {
                names: vec!["p".to_string(), "q".to_string()]
            }
        );
    }

    #[test]
    fn test_missing_reference_is_unreachable() {
        let entries = [entry("a", &[]), entry("b", &["ghost"])];
        let err = layer_waves(&entries, 0).unwrap_err();
        assert_eq!(
            err,
            PidlError::UnreachableTasks {
                names: vec!["b".to_string()]
            }
        );
    }

    #[test]
    fn test_downstream_of_cycle_is_unreachable_too() {
        let entries = [entry("p", &["q"]), entry("q", &["p"]), entry("r", &["p"])];
        let err = layer_waves(&entries, 0).unwrap_err();
        match err {
            PidlError::UnreachableTasks { names } => {
                assert_eq!(names, vec!["p", "q", "r"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
