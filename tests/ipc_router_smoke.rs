use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};

#[test]
fn health_unknown_method_and_no_workspace_codes() {
    let exe = env!("CARGO_BIN_EXE_carpoold");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn carpoold");
    let mut stdin = child.stdin.take().expect("child stdin");
    let mut reader = BufReader::new(child.stdout.take().expect("child stdout"));

    let mut send = |id: &str, method: &str, params: serde_json::Value| -> serde_json::Value {
        writeln!(stdin, "{}", json!({ "id": id, "method": method, "params": params }))
            .expect("write request");
        stdin.flush().expect("flush");
        let mut line = String::new();
        reader.read_line(&mut line).expect("read response");
        serde_json::from_str(line.trim()).expect("parse response")
    };

    let health = send("1", "health", json!({}));
    assert_eq!(health["ok"], json!(true));
    assert!(health["result"]["version"].is_string());
    assert!(health["result"]["workspacePath"].is_null());

    let unknown = send("2", "calendar.explode", json!({}));
    assert_eq!(unknown["ok"], json!(false));
    assert_eq!(unknown["error"]["code"], json!("not_implemented"));

    // Listing before a workspace is selected is an empty collection, not an error.
    let drivers = send("3", "drivers.list", json!({}));
    assert_eq!(drivers["ok"], json!(true));
    assert_eq!(drivers["result"]["drivers"], json!([]));

    // Mutating without a workspace is rejected.
    let create = send(
        "4",
        "drivers.create",
        json!({ "familyName": "Smith", "seatCapacity": 4 }),
    );
    assert_eq!(create["ok"], json!(false));
    assert_eq!(create["error"]["code"], json!("no_workspace"));

    let _ = child.kill();
}
