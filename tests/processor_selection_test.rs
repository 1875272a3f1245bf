use altfactor::application::processing::{
    DataProcessor, FactorValueTransform, ParallelProcessor, ProcessorFactory, SequentialProcessor,
    create_processor,
};
use altfactor::config::{ProcessorConfig, ProcessorType, Properties};
use altfactor::domain::errors::{ErrorKind, FactorResult};
use altfactor::domain::ml::Record;
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

fn records(n: usize) -> Vec<Record> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            Record::new(
                start + Duration::days(i as i64),
                vec![(i % 13) as f64, (i % 5) as f64 * 0.1, 1.0],
                i as f64 * 0.01,
            )
        })
        .collect()
}

fn optimized_props() -> Properties {
    Properties::new()
        .with("processor.type", "optimized")
        .with("processor.threshold", "500")
        .with("processor.batchSize", "100")
        .with("processor.threads", "4")
}

#[test]
fn test_optimized_below_threshold_runs_single_threaded() {
    let processor = create_processor(&optimized_props()).unwrap();
    assert_eq!(processor.name(), "optimized");

    let out = processor.process(&records(499)).unwrap();
    assert_eq!(out.len(), 499);

    let stats = processor.stats();
    assert_eq!(stats.sequential_runs, 1);
    assert_eq!(stats.parallel_runs, 0);
    assert_eq!(stats.batches_dispatched, 0);
}

#[test]
fn test_optimized_above_threshold_splits_into_batches() {
    let processor = create_processor(&optimized_props()).unwrap();

    let out = processor.process(&records(501)).unwrap();
    assert_eq!(out.len(), 501);

    let stats = processor.stats();
    assert_eq!(stats.sequential_runs, 0);
    assert_eq!(stats.parallel_runs, 1);
    // 5 x 100 + 1 x 1
    assert_eq!(stats.batches_dispatched, 6);
}

#[test]
fn test_single_is_deterministic() {
    let props = Properties::new().with("processor.type", "single");
    let processor = create_processor(&props).unwrap();
    let input = records(321);

    let first = processor.process(&input).unwrap();
    let second = processor.process(&input).unwrap();
    assert_eq!(first, second);
    assert!(
        first
            .iter()
            .zip(input.iter())
            .all(|(out, inp)| out.date == inp.date)
    );
}

#[test]
fn test_parallel_equals_sequential_for_pure_transform() {
    let transform = |r: &Record| -> FactorResult<Record> {
        let mut out = r.clone();
        out.factor_value = Some(r.features.iter().map(|f| f * f).sum::<f64>().sqrt());
        out.realized_return = Some(r.target - 0.5);
        Ok(out)
    };
    let transform = Arc::new(transform);
    let input = records(1013);
    let expected = SequentialProcessor::new(transform.clone())
        .process(&input)
        .unwrap();

    for threads in [1, 3, 8] {
        for batch_size in [1, 10, 999, 5000] {
            let parallel = ParallelProcessor::new(threads, batch_size, transform.clone()).unwrap();
            assert_eq!(parallel.process(&input).unwrap(), expected);
        }
    }
}

#[test]
fn test_unknown_type_falls_back_to_parallel() {
    let props = Properties::new()
        .with("processor.type", "quantum")
        .with("processor.threads", "2");
    let config = ProcessorConfig::from_properties(&props).unwrap();
    assert_eq!(config.processor_type, ProcessorType::Parallel);

    let processor = create_processor(&props).unwrap();
    assert_eq!(processor.name(), "parallel");
}

#[test]
fn test_malformed_numeric_values_are_configuration_errors() {
    for (key, value) in [
        ("processor.threads", "many"),
        ("processor.batchSize", "1.5"),
        ("processor.threshold", "0"),
    ] {
        let props = Properties::new().with(key, value);
        let err = create_processor(&props).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains(key), "{}", err);
    }
}

#[test]
fn test_selector_builds_independent_processors() {
    let config = ProcessorConfig::from_properties(&optimized_props()).unwrap();
    let a = ProcessorFactory::create(&config, Arc::new(FactorValueTransform)).unwrap();
    let b = ProcessorFactory::create(&config, Arc::new(FactorValueTransform)).unwrap();

    let input = records(600);
    assert_eq!(a.process(&input).unwrap(), b.process(&input).unwrap());

    a.process(&input).unwrap();
    assert_eq!(a.stats().parallel_runs, 2);
    assert_eq!(b.stats().parallel_runs, 1);
}

#[test]
fn test_empty_input_returns_empty_for_every_type() {
    for kind in ["single", "parallel", "optimized"] {
        let props = Properties::new()
            .with("processor.type", kind)
            .with("processor.threads", "2");
        let processor = create_processor(&props).unwrap();
        assert!(processor.process(&[]).unwrap().is_empty());
    }
}

#[test]
fn test_processing_does_not_mutate_input() {
    let processor = create_processor(&optimized_props()).unwrap();
    let input = records(700);
    let snapshot = input.clone();

    let out = processor.process(&input).unwrap();
    assert_eq!(input, snapshot);
    assert!(out.iter().all(|r| r.factor_value.is_some()));
}
