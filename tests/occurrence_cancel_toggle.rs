
use serde_json::json;
use test_support::{request_err, request_ok, spawn_with_workspace};

#[test]
fn cancelling_clears_assignments_and_uncancelling_does_not_restore_them() {
    let (_child, mut stdin, mut reader) = spawn_with_workspace("carpool-cancel");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "activities.create",
        json!({ "name": "Soccer", "day": 1, "time": "15:00", "location": "Field A" }),
    );
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "occurrences.list",
        json!({ "startDate": "2024-06-03", "endDate": "2024-06-09" }),
    );
    let occ = listed["occurrences"][0]["id"].as_str().expect("occurrence").to_string();

    // Two drivers, three riders.
    let smith = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "drivers.create",
        json!({ "familyName": "Smith", "seatCapacity": 4 }),
    );
    let jones = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "drivers.create",
        json!({ "familyName": "Jones", "seatCapacity": 4 }),
    );
    let set = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "assignments.drivers.set",
        json!({ "occurrenceId": occ, "driverIds": [smith["id"], jones["id"]] }),
    );
    let jones_assignment = set["assignments"][0]["assignmentId"].as_str().expect("a0");
    let smith_assignment = set["assignments"][1]["assignmentId"].as_str().expect("a1");

    let mut kid_ids = Vec::new();
    for (i, name) in ["Ava", "Ben", "Cleo"].iter().enumerate() {
        let kid = request_ok(
            &mut stdin,
            &mut reader,
            &format!("k{}", i),
            "kids.create",
            json!({ "name": name }),
        );
        kid_ids.push(kid["id"].as_str().expect("kid id").to_string());
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "assignments.kids.set",
        json!({
            "occurrenceId": occ,
            "buckets": [
                { "driverAssignmentId": smith_assignment, "kidIds": [kid_ids[0], kid_ids[1]] },
                { "driverAssignmentId": jones_assignment, "kidIds": [kid_ids[2]] }
            ]
        }),
    );

    let toggled = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "occurrences.toggleCancelled",
        json!({ "occurrenceId": occ }),
    );
    assert_eq!(toggled["isCancelled"], json!(true));

    let drivers = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "assignments.drivers.list",
        json!({ "occurrenceId": occ }),
    );
    assert_eq!(drivers["assignments"], json!([]));
    let kids = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "assignments.kids.list",
        json!({ "occurrenceId": occ }),
    );
    assert_eq!(kids["assignments"], json!([]));

    // Uncancel: the slot reopens empty, assignments must be re-entered.
    let toggled = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "occurrences.toggleCancelled",
        json!({ "occurrenceId": occ }),
    );
    assert_eq!(toggled["isCancelled"], json!(false));
    let drivers = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "assignments.drivers.list",
        json!({ "occurrenceId": occ }),
    );
    assert_eq!(drivers["assignments"], json!([]));

    let _ = request_err(
        &mut stdin,
        &mut reader,
        "12",
        "occurrences.toggleCancelled",
        json!({ "occurrenceId": "missing" }),
        "not_found",
    );
}
