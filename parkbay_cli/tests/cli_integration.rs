use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

const CONFIG: &str = r#"
[system]
topic_prefix = "parkbay"
cycle_ms = 100

[sensors.range]
kind = "tfmini"
[sensors.lat]
kind = "vl53l1x"

[bay]
id = "bay1"
name = "Test Bay"

[bay.range]
sensor = "range"
max_detect_range = "300 cm"
stop_distance = "10 cm"

[[bay.lateral]]
sensor = "lat"
side = "L"
ideal = "50 cm"
ok_spread = "1 cm"
warn_spread = "3 cm"
critical_spread = "5 cm"
intercept = "200 cm"

[[triggers]]
type = "syscmd"
id = "sys"

[[triggers]]
type = "baycmd"
id = "bay1_cmd"
"#;

const SCRIPT: &str = "\
cycle,kind,key,value
1,message,parkbay/bay1/cmd,dock
1,reading,range,250 cm
1,reading,lat,50 cm
2,reading,range,1500 mm
2,reading,lat,52 cm
2,message,parkbay/cmd,rescan
";

fn write_config(dir: &tempfile::TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, text).unwrap();
    path
}

fn write_script(dir: &tempfile::TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("script.csv");
    fs::write(&path, text).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["check"], 0, "config ok: bay 'bay1' (Test Bay)", "stdout")]
#[case(&["check"], 0, "bay1_cmd baycmd parkbay/bay1/cmd", "stdout")]
#[case(&["replay"], 2, "required", "stderr")]
#[case(&["replay", "--readings", "{script}", "--online"], 0, "cycle=1 t=0ms bay1 lifecycle=ready activity=idle", "stdout")]
#[case(&["replay", "--readings", "{script}", "--online"], 0, "bay=[dock]", "stdout")]
#[case(&["replay", "--readings", "{script}", "--online"], 0, "activity=docking occupancy=occupied motion=approaching", "stdout")]
#[case(&["replay", "--readings", "{script}", "--online"], 0, "sys=[rescan]", "stdout")]
#[case(&["replay", "--readings", "{script}"], 0, "lifecycle=initializing", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, CONFIG);
    let script = write_script(&dir, SCRIPT);

    let mut cmd = Command::cargo_bin("parkbay").unwrap();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
    cmd.env_remove("RUST_LOG");

    for a in args {
        if *a == "{script}" {
            cmd.arg(&script);
        } else {
            cmd.arg(a);
        }
    }

    let assert = cmd.assert().code(exit_code);

    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn replay_prints_one_line_per_cycle_including_gaps() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, CONFIG);
    let script = write_script(
        &dir,
        "cycle,kind,key,value\n1,reading,range,250 cm\n4,reading,range,240 cm\n",
    );

    let out = Command::cargo_bin("parkbay")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--readings")
        .arg(&script)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4, "stdout was: {stdout}");
    assert!(lines[3].starts_with("cycle=4 t=300ms"), "{}", lines[3]);
}

#[rstest]
fn cli_reports_bad_script_header() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, CONFIG);

    let bad_csv = dir.path().join("bad.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "sensor,value").unwrap();
    writeln!(f, "range,100 cm").unwrap();

    let mut cmd = Command::cargo_bin("parkbay").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--readings")
        .arg(&bad_csv);

    cmd.assert()
        .code(4)
        .stderr(predicate::str::contains("cycle,kind,key,value"));
}

#[rstest]
fn missing_config_file_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("parkbay").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("check");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("The config could not be loaded"));
}

#[rstest]
#[case::zero_cycle("cycle_ms = 100", "cycle_ms = 0", "cycle_ms must be >= 1")]
#[case::undefined_sensor("sensor = \"lat\"", "sensor = \"ghost\"", "undefined sensor 'ghost'")]
fn invalid_config_is_rejected_before_anything_runs(
    #[case] from: &str,
    #[case] to: &str,
    #[case] needle: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &CONFIG.replace(from, to));
    let mut cmd = Command::cargo_bin("parkbay").unwrap();
    cmd.arg("--config").arg(&cfg).arg("check");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn shipped_sample_config_and_demo_replay() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..");
    let out = Command::cargo_bin("parkbay")
        .unwrap()
        .arg("--config")
        .arg(root.join("etc/parkbay.toml"))
        .arg("replay")
        .arg("--readings")
        .arg(root.join("demos/docking.csv"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    // The door opens on an empty bay, so the occupancy trigger asks for a dock.
    assert!(stdout.contains("cycle=2 t=100ms bay1 lifecycle=ready activity=idle occupancy=unoccupied"), "{stdout}");
    assert!(stdout.contains("bay=[dock]"), "{stdout}");
    let last = stdout.lines().last().unwrap_or_default();
    assert!(last.contains("bay=[abort"), "{last}");
}
