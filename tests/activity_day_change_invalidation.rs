
use serde_json::json;
use test_support::{request_err, request_ok, spawn_with_workspace};

#[test]
fn changing_the_recurrence_day_purges_and_rematerializes() {
    let (_child, mut stdin, mut reader) = spawn_with_workspace("carpool-day-change");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "activities.create",
        json!({ "name": "Soccer", "day": 1, "time": "15:00", "location": "Field A" }),
    );
    let activity_id = created["id"].as_str().expect("activity id").to_string();

    let window = json!({ "startDate": "2024-06-03", "endDate": "2024-06-16" });
    let before = request_ok(&mut stdin, &mut reader, "2", "occurrences.list", window.clone());
    let monday_occ = before["occurrences"][0]["id"].as_str().expect("occ").to_string();
    assert_eq!(before["occurrences"][0]["date"], json!("2024-06-03"));

    // Assign a driver so the purge has something transitive to remove.
    let driver = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "drivers.create",
        json!({ "familyName": "Smith", "seatCapacity": 4 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.drivers.set",
        json!({ "occurrenceId": monday_occ, "driverIds": [driver["id"]] }),
    );

    // Monday -> Wednesday.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "activities.update",
        json!({
            "activityId": activity_id,
            "name": "Soccer",
            "day": 3,
            "time": "15:00",
            "location": "Field A"
        }),
    );

    let after = request_ok(&mut stdin, &mut reader, "6", "occurrences.list", window);
    let dates: Vec<&str> = after["occurrences"]
        .as_array()
        .expect("occurrences")
        .iter()
        .map(|o| o["date"].as_str().expect("date"))
        .collect();
    assert_eq!(dates, vec!["2024-06-05", "2024-06-12"]);

    // The old Monday occurrence is gone along with its assignments.
    let _ = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "assignments.drivers.list",
        json!({ "occurrenceId": monday_occ }),
        "not_found",
    );
}

#[test]
fn updating_without_a_day_change_keeps_occurrences_and_assignments() {
    let (_child, mut stdin, mut reader) = spawn_with_workspace("carpool-rename");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "activities.create",
        json!({ "name": "Soccer", "day": 1, "time": "15:00", "location": "Field A" }),
    );
    let activity_id = created["id"].as_str().expect("activity id").to_string();

    let window = json!({ "startDate": "2024-06-03", "endDate": "2024-06-09" });
    let before = request_ok(&mut stdin, &mut reader, "2", "occurrences.list", window.clone());
    let occ = before["occurrences"][0]["id"].as_str().expect("occ").to_string();

    let driver = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "drivers.create",
        json!({ "familyName": "Smith", "seatCapacity": 4 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.drivers.set",
        json!({ "occurrenceId": occ, "driverIds": [driver["id"]] }),
    );

    // Same day, new time and name: nothing is invalidated.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "activities.update",
        json!({
            "activityId": activity_id,
            "name": "Soccer Practice",
            "day": 1,
            "time": "16:00",
            "location": "Field B"
        }),
    );

    let after = request_ok(&mut stdin, &mut reader, "6", "occurrences.list", window);
    assert_eq!(after["occurrences"][0]["id"].as_str(), Some(occ.as_str()));
    assert_eq!(after["occurrences"][0]["name"], json!("Soccer Practice"));

    let drivers = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "assignments.drivers.list",
        json!({ "occurrenceId": occ }),
    );
    assert_eq!(drivers["assignments"].as_array().expect("assignments").len(), 1);
}
