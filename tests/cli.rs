//! Experiment runner round trips through real files

use std::fs;
use std::path::PathBuf;

use tempfile::tempdir;
use tiltplan::io::cli::{Cli, ExperimentRunner, SolverKind};
use tiltplan::io::instance::read_instance;

const SAMPLE: &str = r##"{
    "board": {
        "width": 3,
        "height": 3,
        "concrete": [
            [false, false, false],
            [false, false, false],
            [false, false, false]
        ],
        "tiles": [
            {"x": 2, "y": 2, "glues": [null, null, null, null], "color": "#FFFF00"}
        ],
        "glueRules": {"rules": [], "class": "ReflexiveGlueRules"}
    },
    "target_shape": {
        "tiles": [
            {"x": 0, "y": 0, "glues": [null, null, null, null], "color": "#FFFF00"}
        ]
    }
}"##;

fn cli_for(input: PathBuf, out: PathBuf) -> Cli {
    Cli {
        input,
        out: Some(out),
        outdir: None,
        timeout: Some(60),
        profile: true,
        solver: SolverKind::Default,
        heuristic: None,
        seed: 42,
    }
}

#[test]
fn test_single_instance_run_writes_result() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corner.json");
    let output = dir.path().join("corner_result.json");
    fs::write(&input, SAMPLE).unwrap();

    let runner = ExperimentRunner::new(cli_for(input.clone(), output.clone()));
    assert_eq!(runner.run(), 0);

    let result: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(result["timed_out"], serde_json::Value::Bool(false));
    assert_eq!(result["control_sequence_length"], serde_json::json!(4));
    let sequence = result["control_sequence"].as_str().unwrap();
    assert_eq!(sequence.len(), 4);
    assert!(sequence.chars().all(|c| "NESW".contains(c)));
    assert!(result["runtime_profile"].as_str().unwrap().contains("solve"));
    // the instance is embedded and decodable again
    assert_eq!(result["instance"]["board"]["width"], serde_json::json!(3));

    // a second run refuses to overwrite the result
    let runner = ExperimentRunner::new(cli_for(input, output));
    assert_eq!(runner.run(), 2);
}

#[test]
fn test_missing_input_exits_with_error() {
    let dir = tempdir().unwrap();
    let runner = ExperimentRunner::new(cli_for(
        dir.path().join("nope.json"),
        dir.path().join("nope_result.json"),
    ));
    assert_eq!(runner.run(), -1);
}

#[test]
fn test_directory_mode_processes_all_instances() {
    let dir = tempdir().unwrap();
    let outdir = dir.path().join("results");
    for name in ["a.json", "b.json"] {
        fs::write(dir.path().join(name), SAMPLE).unwrap();
    }

    let cli = Cli {
        input: dir.path().to_path_buf(),
        out: None,
        outdir: Some(outdir.clone()),
        timeout: Some(60),
        profile: false,
        solver: SolverKind::Bfs,
        heuristic: None,
        seed: 42,
    };
    assert_eq!(ExperimentRunner::new(cli).run(), 0);
    assert!(outdir.join("a_result.json").exists());
    assert!(outdir.join("b_result.json").exists());

    // results embed instances that decode into equivalent boards
    let embedded: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(outdir.join("a_result.json")).unwrap()).unwrap();
    let instance_file = dir.path().join("roundtrip.json");
    fs::write(
        &instance_file,
        serde_json::to_string(&embedded["instance"]).unwrap(),
    )
    .unwrap();
    let decoded = read_instance(&instance_file).unwrap();
    assert_eq!(decoded.board.number_of_tiles(), 1);
}
