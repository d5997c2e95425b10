use monkeytest::bench::cache::FixedTempDir;
use monkeytest::bench::{Benchmark, ChannelObserver, NoProgress, Phase, Privilege};
use monkeytest::cli::Cli;
use monkeytest::config::{CacheDropPolicy, Settings};
use monkeytest::report::{render_text, write_json};
use monkeytest::BenchError;
use clap::Parser;
use tokio::sync::mpsc;

const JSON_KEYS: [&str; 11] = [
    "written_mb",
    "write_time",
    "write_speed",
    "write_speed_min",
    "write_speed_max",
    "read_blocks",
    "block_size",
    "read_time",
    "read_speed",
    "read_speed_min",
    "read_speed_max",
];

fn benchmark_for(args: &[&str], dir: &std::path::Path) -> Benchmark {
    let target = dir.join("monkeytest");
    let mut argv = vec!["monkeytest", "-f", target.to_str().unwrap()];
    argv.extend_from_slice(args);

    let config = Cli::try_parse_from(argv)
        .unwrap()
        .to_config(&Settings::default())
        .unwrap();
    Benchmark::new(config)
        .with_temp_dir(FixedTempDir(dir.to_path_buf()))
        .with_privilege(Privilege::Unprivileged)
}

#[test]
fn test_json_report_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let bench = benchmark_for(&["-s", "1MB", "-w", "256KB", "-r", "64KB", "--cache-drop", "skip"], dir.path());

    let report = bench.run(&mut NoProgress).unwrap();
    let json_path = dir.path().join("result.json");
    write_json(&json_path, &report.summary).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), JSON_KEYS.len());
    for key in JSON_KEYS {
        let number = object[key].as_f64().unwrap_or_else(|| panic!("{} not numeric", key));
        assert!(number >= 0.0, "{} is negative", key);
    }
    assert_eq!(object["written_mb"].as_f64(), Some(1.0));
    assert_eq!(object["read_blocks"].as_u64(), Some(16));
    assert_eq!(object["block_size"].as_u64(), Some(64 * 1024));

    assert!(!dir.path().join("monkeytest").exists());
}

#[test]
fn test_text_report_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let bench = benchmark_for(&["-s", "2MB", "-w", "128KB", "-r", "4KB", "--fill", "zero"], dir.path());

    let report = bench.run(&mut NoProgress).unwrap();
    let text = render_text(&report.summary);

    assert!(text.starts_with("Written 2 MB in"));
    assert!(text.contains("Read 512 x 4096 B blocks in"));
    assert_eq!(text.matches("MB/s").count(), 2);
}

#[test]
fn test_block_size_larger_than_payload() {
    let dir = tempfile::tempdir().unwrap();
    let bench = benchmark_for(&["-s", "1MB", "-w", "2MB", "-r", "2MB", "--cache-drop", "skip"], dir.path());

    let summary = bench.run(&mut NoProgress).unwrap().summary;
    assert_eq!(summary.write_blocks, 1);
    assert_eq!(summary.read_blocks, 1);
    assert_eq!(summary.read_block_size, 1024 * 1024);
}

#[test]
fn test_required_policy_without_root() {
    let dir = tempfile::tempdir().unwrap();
    let bench = benchmark_for(&["-s", "64KB", "--cache-drop", "required"], dir.path());

    let err = bench.run(&mut NoProgress).unwrap_err();
    assert!(matches!(err, BenchError::PermissionDenied(_)));
    assert_eq!(monkeytest::error::exit_code(&err), 3);
}

#[tokio::test]
async fn test_progress_over_channel() {
    let dir = tempfile::tempdir().unwrap();
    let bench = benchmark_for(&["-s", "256KB", "-w", "4KB", "-r", "512B", "--cache-drop", "skip"], dir.path());

    let (tx, mut rx) = mpsc::channel(256);
    let handle = tokio::task::spawn_blocking(move || bench.run(&mut ChannelObserver(tx)));

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }
    let report = handle.await.unwrap().unwrap();

    assert_eq!(report.summary.read_blocks, 512);
    assert!(updates.iter().filter(|u| u.phase == Phase::Write).count() <= 101);
    assert!(updates.iter().filter(|u| u.phase == Phase::Read).count() <= 101);
    let last = updates.last().unwrap();
    assert_eq!(last.phase, Phase::Read);
    assert_eq!(last.percent(), 100.0);
}

#[test]
fn test_policy_from_defaults_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monkeytest.toml");
    std::fs::write(&path, "cache_drop = \"skip\"\nsize = \"128KB\"\nread_block_size = \"4KB\"\n").unwrap();

    let settings = Settings::load(Some(&path)).unwrap();
    let cli = Cli::try_parse_from(["monkeytest", "-s", "64KB"]).unwrap();
    let config = cli.to_config(&settings).unwrap();

    assert_eq!(config.cache_drop, CacheDropPolicy::Skip);
    assert_eq!(config.total_size, 64 * 1024);
    assert_eq!(config.read_block_size, 4096);
}
