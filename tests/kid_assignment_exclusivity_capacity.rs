
use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{request_err, request_ok, spawn_with_workspace};

struct Fixture {
    occurrence_id: String,
    smith_assignment: String,
    jones_assignment: String,
    kid_ids: Vec<String>,
}

fn build_fixture(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> Fixture {
    let _ = request_ok(
        stdin,
        reader,
        "f1",
        "activities.create",
        json!({ "name": "Soccer", "day": 1, "time": "15:00", "location": "Field A" }),
    );
    let listed = request_ok(
        stdin,
        reader,
        "f2",
        "occurrences.list",
        json!({ "startDate": "2024-06-03", "endDate": "2024-06-09" }),
    );
    let occurrence_id = listed["occurrences"][0]["id"]
        .as_str()
        .expect("occurrence id")
        .to_string();

    let smith = request_ok(
        stdin,
        reader,
        "f3",
        "drivers.create",
        json!({ "familyName": "Smith", "seatCapacity": 4 }),
    );
    let jones = request_ok(
        stdin,
        reader,
        "f4",
        "drivers.create",
        json!({ "familyName": "Jones", "seatCapacity": 2 }),
    );
    let set = request_ok(
        stdin,
        reader,
        "f5",
        "assignments.drivers.set",
        json!({
            "occurrenceId": occurrence_id,
            "driverIds": [smith["id"], jones["id"]]
        }),
    );
    // Result is ordered by family name: Jones, Smith.
    let jones_assignment = set["assignments"][0]["assignmentId"]
        .as_str()
        .expect("jones assignment")
        .to_string();
    let smith_assignment = set["assignments"][1]["assignmentId"]
        .as_str()
        .expect("smith assignment")
        .to_string();

    let mut kid_ids = Vec::new();
    for (i, name) in ["Ava", "Ben", "Cleo", "Dan", "Edie"].iter().enumerate() {
        let kid = request_ok(
            stdin,
            reader,
            &format!("k{}", i),
            "kids.create",
            json!({ "name": name }),
        );
        kid_ids.push(kid["id"].as_str().expect("kid id").to_string());
    }

    Fixture {
        occurrence_id,
        smith_assignment,
        jones_assignment,
        kid_ids,
    }
}

#[test]
fn capacity_violation_rejects_whole_call_and_leaves_state_untouched() {
    let (_child, mut stdin, mut reader) = spawn_with_workspace("carpool-capacity");
    let fx = build_fixture(&mut stdin, &mut reader);

    // Seed one rider so we can prove rejection leaves prior state alone.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "assignments.kids.set",
        json!({
            "occurrenceId": fx.occurrence_id,
            "buckets": [{ "driverAssignmentId": fx.smith_assignment, "kidIds": [fx.kid_ids[0]] }]
        }),
    );

    // Five kids into four seats.
    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "assignments.kids.set",
        json!({
            "occurrenceId": fx.occurrence_id,
            "buckets": [{ "driverAssignmentId": fx.smith_assignment, "kidIds": fx.kid_ids }]
        }),
        "capacity_exceeded",
    );
    assert!(
        error["message"].as_str().expect("message").contains("Smith"),
        "capacity error should name the driver: {}",
        error
    );

    let after = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "assignments.kids.list",
        json!({ "occurrenceId": fx.occurrence_id }),
    );
    let rows = after["assignments"].as_array().expect("assignments");
    assert_eq!(rows.len(), 1, "rejected call must not change stored state");
    assert_eq!(rows[0]["kidId"].as_str(), Some(fx.kid_ids[0].as_str()));
}

#[test]
fn kid_listed_under_two_buckets_lands_in_the_last_one() {
    let (_child, mut stdin, mut reader) = spawn_with_workspace("carpool-exclusivity");
    let fx = build_fixture(&mut stdin, &mut reader);

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "assignments.kids.set",
        json!({
            "occurrenceId": fx.occurrence_id,
            "buckets": [
                { "driverAssignmentId": fx.smith_assignment, "kidIds": [fx.kid_ids[0], fx.kid_ids[1]] },
                { "driverAssignmentId": fx.jones_assignment, "kidIds": [fx.kid_ids[0]] }
            ]
        }),
    );
    let rows = result["assignments"].as_array().expect("assignments");
    assert_eq!(rows.len(), 2);
    for row in rows {
        if row["kidId"].as_str() == Some(fx.kid_ids[0].as_str()) {
            assert_eq!(
                row["driverAssignmentId"].as_str(),
                Some(fx.jones_assignment.as_str()),
                "conflicted kid must end up under the last bucket"
            );
        }
    }
    let buckets: Vec<&str> = rows
        .iter()
        .filter(|r| r["kidId"].as_str() == Some(fx.kid_ids[0].as_str()))
        .map(|r| r["driverAssignmentId"].as_str().expect("bucket"))
        .collect();
    assert_eq!(buckets.len(), 1, "a kid appears under exactly one bucket");

    // An empty bucket clears; a full replace applies the whole mapping.
    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "assignments.kids.set",
        json!({
            "occurrenceId": fx.occurrence_id,
            "buckets": [
                { "driverAssignmentId": fx.smith_assignment, "kidIds": [] },
                { "driverAssignmentId": fx.jones_assignment, "kidIds": [fx.kid_ids[2]] }
            ]
        }),
    );
    let rows = cleared["assignments"].as_array().expect("assignments");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["kidId"].as_str(), Some(fx.kid_ids[2].as_str()));

    // A bucket id from some other occurrence is a typed failure.
    let _ = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "assignments.kids.set",
        json!({
            "occurrenceId": fx.occurrence_id,
            "buckets": [{ "driverAssignmentId": "not-an-assignment", "kidIds": [] }]
        }),
        "not_found",
    );
}
