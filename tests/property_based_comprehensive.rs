//! Property-based tests for the parsing and fitting core
//!
//! Core properties tested:
//! 1. Dump parsing counts exactly the well-formed register lines
//! 2. Dump parsing is deterministic
//! 3. Breakpoints are strictly increasing interior indices
//! 4. Linear series fit as a single exact segment
//! 5. Reported R² agrees with the model's own evaluator

use proptest::prelude::*;
use regfit::breakpoints::detect_breakpoints;
use regfit::config::FitConfig;
use regfit::dump::parse_dump;
use regfit::fit::{fit_piecewise, r_squared};

/// Strictly increasing frequencies with matching values
fn series_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    prop::collection::vec((1u32..400, 0u32..10_000), 3..40).prop_map(|steps| {
        let mut freq = 0.0;
        steps
            .into_iter()
            .map(|(step, value)| {
                freq += f64::from(step);
                (freq, f64::from(value))
            })
            .unzip()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_parser_counts_well_formed_lines(
        regs in prop::collection::btree_map("(mc|emc|MC|EMC)_[a-z0-9_]{1,12}", any::<u32>(), 0..30),
        noise in prop::collection::vec("[a-z]{1,8} [0-9]{1,4}", 0..10),
    ) {
        let mut content = String::from("# generated dump\n\n");
        for (name, value) in &regs {
            content.push_str(&format!("{name}    0x{value:08x}\n"));
        }
        for line in &noise {
            content.push_str(line);
            content.push('\n');
        }

        let parsed = parse_dump(&content);
        prop_assert_eq!(parsed.len(), regs.len());
        for (name, value) in &regs {
            prop_assert_eq!(parsed.get(name).copied(), Some(u64::from(*value)));
        }
    }

    #[test]
    fn prop_parser_is_deterministic(content in "[ -~\n]{0,400}") {
        prop_assert_eq!(parse_dump(&content), parse_dump(&content));
    }

    #[test]
    fn prop_breakpoints_are_interior((x, y) in series_strategy()) {
        let bps = detect_breakpoints(&x, &y, &FitConfig::default());
        prop_assert!(bps.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(bps.iter().all(|&i| i >= 1 && i <= x.len() - 2));
    }

    #[test]
    fn prop_linear_series_single_segment(
        slope in -50i32..50,
        intercept in -1000i32..1000,
        (x, _) in series_strategy(),
    ) {
        prop_assume!(slope != 0);
        let (a, b) = (f64::from(slope), f64::from(intercept));
        let y: Vec<f64> = x.iter().map(|v| a * v + b).collect();

        let model = fit_piecewise(&x, &y, "emc_prop", &FitConfig::default()).unwrap();
        prop_assert_eq!(model.segments().len(), 1);
        let seg = model.segments()[0];
        prop_assert!((seg.slope - a).abs() < 1e-6);
        prop_assert!((seg.intercept - b).abs() < 1e-3);
        prop_assert!((model.r_squared() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_r_squared_matches_evaluator((x, y) in series_strategy()) {
        let model = fit_piecewise(&x, &y, "emc_prop", &FitConfig::default()).unwrap();
        let fitted: Vec<f64> = x.iter().map(|&v| model.evaluate(v)).collect();

        prop_assert_eq!(r_squared(&y, &fitted), model.r_squared());
        prop_assert!((0.0..=1.0).contains(&model.r_squared()));
        prop_assert!(model.segments().windows(2).all(|w| w[0].threshold < w[1].threshold));
    }
}
