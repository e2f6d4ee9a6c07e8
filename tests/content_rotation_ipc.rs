mod test_support;

use serde_json::json;
use test_support::{admin, request_err, request_ok, spawn_sidecar, student, teacher, temp_dir};

fn item_text(result: &serde_json::Value) -> Option<String> {
    result
        .get("item")
        .and_then(|i| i.get("text"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[test]
fn replace_trims_drops_blanks_and_keeps_positions() {
    let workspace = temp_dir("focus-content-replace");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let replaced = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "content.weeklyIntentions.replace",
        json!({
            "caller": admin(),
            "items": ["  Be kind to yourself ", "", "   ", "Finish one thing", "Call a friend"],
        }),
    );
    let items = replaced.get("items").and_then(|v| v.as_array()).expect("items");
    let texts: Vec<&str> = items
        .iter()
        .filter_map(|i| i.get("text").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(
        texts,
        vec!["Be kind to yourself", "Finish one thing", "Call a friend"]
    );
    let orders: Vec<i64> = items
        .iter()
        .filter_map(|i| i.get("order").and_then(|v| v.as_i64()))
        .collect();
    assert_eq!(orders, vec![0, 3, 4]);

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "content.weeklyIntentions.list",
        json!({ "caller": { "role": "moderator" } }),
    );
    assert_eq!(listed.get("items"), replaced.get("items"));

    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "content.weeklyIntentions.replace",
        json!({ "caller": admin(), "items": [] }),
    );
    assert_eq!(
        cleared.get("items").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "5",
            "content.weeklyIntentions.replace",
            json!({ "caller": admin(), "items": ["ok", 7] }),
        ),
        "bad_params"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "6",
            "content.dailyQuestions.replace",
            json!({ "caller": admin() }),
        ),
        "bad_params"
    );
}

#[test]
fn content_management_requires_admin_or_moderator() {
    let workspace = temp_dir("focus-content-access");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "2",
            "content.dailyQuestions.replace",
            json!({ "caller": teacher(1), "items": ["Why?"] }),
        ),
        "forbidden"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "3",
            "content.dailyQuestions.list",
            json!({ "caller": student(1) }),
        ),
        "forbidden"
    );
}

#[test]
fn weekly_pick_is_stable_across_the_iso_week() {
    let workspace = temp_dir("focus-content-weekly");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "content.weeklyIntentions.replace",
        json!({
            "caller": admin(),
            "items": ["Sleep early", "Drink water", "Walk outside", "Read ten pages", "Say thanks"],
        }),
    );

    let monday = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "content.weeklyIntention",
        json!({ "caller": student(1), "date": "2024-03-04" }),
    );
    assert_eq!(monday.get("seed").and_then(|v| v.as_str()), Some("2024-03-04"));
    let picked = item_text(&monday).expect("weekly pick");

    for (i, day) in ["2024-03-05", "2024-03-07", "2024-03-10"].iter().enumerate() {
        let r = request_ok(
            &mut stdin,
            &mut reader,
            &format!("4-{}", i),
            "content.weeklyIntention",
            json!({ "caller": student(1), "date": day }),
        );
        assert_eq!(r.get("seed").and_then(|v| v.as_str()), Some("2024-03-04"));
        assert_eq!(item_text(&r).as_deref(), Some(picked.as_str()));
    }

    let next_week = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "content.weeklyIntention",
        json!({ "caller": student(1), "date": "2024-03-11" }),
    );
    assert_eq!(next_week.get("seed").and_then(|v| v.as_str()), Some("2024-03-11"));
    assert!(item_text(&next_week).is_some());

    let today = request_ok(&mut stdin, &mut reader, "6", "content.weeklyIntention", json!({ "caller": teacher(1) }));
    assert!(item_text(&today).is_some());
    assert!(today.get("seed").and_then(|v| v.as_str()).is_some());

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "7",
            "content.weeklyIntention",
            json!({ "caller": student(1), "date": "March 4th" }),
        ),
        "bad_params"
    );
}

#[test]
fn daily_pick_uses_the_date_as_seed_and_handles_empty_lists() {
    let workspace = temp_dir("focus-content-daily");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "content.dailyQuestion",
        json!({ "caller": student(1), "date": "2024-03-06" }),
    );
    assert!(empty.get("item").map(|v| v.is_null()).unwrap_or(false));
    assert_eq!(empty.get("seed").and_then(|v| v.as_str()), Some("2024-03-06"));

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "2a",
            "content.dailyQuestion",
            json!({ "date": "2024-03-06" }),
        ),
        "bad_params"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "2b",
            "content.dailyQuestion",
            json!({ "caller": { "role": "janitor" }, "date": "2024-03-06" }),
        ),
        "bad_params"
    );

    let questions = ["What made you smile?", "What did you learn?", "Who helped you?"];
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "content.dailyQuestions.replace",
        json!({ "caller": admin(), "items": questions }),
    );

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "content.dailyQuestion",
        json!({ "caller": student(1), "date": "2024-03-06" }),
    );
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "content.dailyQuestion",
        json!({ "caller": student(1), "date": "2024-03-06" }),
    );
    let text = item_text(&first).expect("daily pick");
    assert!(questions.contains(&text.as_str()));
    assert_eq!(item_text(&again), Some(text));

    let mut seen = std::collections::HashSet::new();
    for day in 1..=28 {
        let r = request_ok(
            &mut stdin,
            &mut reader,
            &format!("d{}", day),
            "content.dailyQuestion",
            json!({ "caller": student(1), "date": format!("2024-02-{:02}", day) }),
        );
        assert_eq!(
            r.get("seed").and_then(|v| v.as_str()),
            Some(format!("2024-02-{:02}", day).as_str())
        );
        seen.insert(item_text(&r).expect("pick"));
    }
    // 28 independent draws over 3 items practically never land on a single one
    assert!(seen.len() > 1);
}
