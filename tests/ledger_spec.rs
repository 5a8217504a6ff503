use chrono::{DateTime, Duration, Utc};
use progress_ledger::db::{keys, KeyValueStore, MemoryStore};
use progress_ledger::error::LedgerError;
use progress_ledger::ledger::Ledger;
use progress_ledger::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn input(project: &str, time_worked: &str, achievement: &str) -> CreateEntryInput {
    CreateEntryInput {
        date: Some("23/09/2025, 21:15".to_string()),
        project: project.to_string(),
        time_worked: time_worked.to_string(),
        achievement: achievement.to_string(),
        evidence: String::new(),
    }
}

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

speculate! {
    before {
        let store = MemoryStore::new();
        let ledger = Ledger::new(store.clone());
    }

    describe "append" {
        it "stores every field and assigns id and creation time" {
            let mut request = input("Alpha", "45 min", "Wireframes done");
            request.evidence = "wireframes_v2.fig".to_string();
            let now = at("2025-09-23T21:15:00Z");

            let saved = ledger.append_at(request, now).expect("Failed to save");

            let listed = ledger.list();
            assert_eq!(listed.len(), 1);
            let entry = &listed[0];
            assert_eq!(entry, &saved);
            assert_eq!(entry.date, "23/09/2025, 21:15");
            assert_eq!(entry.project, "Alpha");
            assert_eq!(entry.time_worked, "45 min");
            assert_eq!(entry.achievement, "Wireframes done");
            assert_eq!(entry.evidence, "wireframes_v2.fig");
            assert!(!entry.id.is_nil());
            assert_eq!(entry.created_at, Some(now));
        }

        it "inserts newest first" {
            ledger.append(input("Alpha", "30 min", "first")).expect("Failed to save");
            ledger.append(input("Beta", "30 min", "second")).expect("Failed to save");

            let listed = ledger.list();
            assert_eq!(listed[0].achievement, "second");
            assert_eq!(listed[1].achievement, "first");
        }

        it "fills a missing date with the creation time" {
            let mut request = input("Alpha", "30 min", "x");
            request.date = None;

            let saved = ledger.append_at(request, at("2025-09-24T20:30:00Z")).expect("Failed to save");
            assert_eq!(saved.date, "24/09/2025, 20:30");
        }

        it "reports every missing required field" {
            let result = ledger.append(input("  ", "", "Done"));

            match result {
                Err(LedgerError::Validation(fields)) => {
                    assert!(fields.contains_key("project"));
                    assert!(fields.contains_key("timeWorked"));
                    assert!(!fields.contains_key("achievement"));
                }
                other => panic!("expected validation error, got {:?}", other),
            }
            assert!(ledger.list().is_empty());
        }

        it "fails without throwing when storage is unavailable" {
            store.set_unavailable(true);

            let result = ledger.append(input("Alpha", "30 min", "x"));
            assert!(matches!(result, Err(LedgerError::Store(_))));

            store.set_unavailable(false);
            assert!(ledger.list().is_empty());
        }
    }

    describe "list" {
        it "returns an empty snapshot when storage is unavailable" {
            ledger.append(input("Alpha", "30 min", "x")).expect("Failed to save");
            store.set_unavailable(true);

            assert!(ledger.list().is_empty());
        }

        it "treats malformed stored data as empty" {
            store.set(keys::ENTRIES, "{not json").expect("Failed to write");
            assert!(ledger.list().is_empty());
        }

        it "drops malformed records and keeps the rest" {
            let raw = serde_json::json!([
                { "project": "Alpha", "timeWorked": "30 min", "achievement": "kept", "date": "x" },
                { "project": "Beta" },
                42
            ]);
            store.set(keys::ENTRIES, &raw.to_string()).expect("Failed to write");

            let listed = ledger.list();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].achievement, "kept");
            assert_eq!(listed[0].evidence, "");
            assert!(listed[0].created_at.is_none());
        }
    }

    describe "remove" {
        it "removes only the matching entry" {
            let a = ledger.append(input("Alpha", "30 min", "a")).expect("Failed to save");
            let b = ledger.append(input("Beta", "30 min", "b")).expect("Failed to save");

            assert!(ledger.remove(a.id).expect("Failed to remove"));

            let listed = ledger.list();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].id, b.id);
        }

        it "is idempotent" {
            let a = ledger.append(input("Alpha", "30 min", "a")).expect("Failed to save");
            ledger.append(input("Beta", "30 min", "b")).expect("Failed to save");

            ledger.remove(a.id).expect("Failed to remove");
            let once = ledger.list();
            assert!(!ledger.remove(a.id).expect("Failed to remove"));
            assert_eq!(ledger.list(), once);
        }

        it "succeeds for an unknown id" {
            assert!(!ledger.remove(Uuid::new_v4()).expect("Failed to remove"));
        }
    }

    describe "update" {
        it "merges only the given fields" {
            let saved = ledger.append(input("Alpha", "30 min", "draft")).expect("Failed to save");

            let updated = ledger
                .update(saved.id, UpdateEntryInput {
                    achievement: Some("final".to_string()),
                    evidence: Some("report.pdf".to_string()),
                    ..Default::default()
                })
                .expect("Failed to update")
                .expect("Entry not found");

            assert_eq!(updated.id, saved.id);
            assert_eq!(updated.created_at, saved.created_at);
            assert_eq!(updated.project, "Alpha");
            assert_eq!(updated.achievement, "final");
            assert_eq!(ledger.list()[0], updated);
        }

        it "returns None for an unknown id" {
            let result = ledger
                .update(Uuid::new_v4(), UpdateEntryInput::default())
                .expect("Failed to update");
            assert!(result.is_none());
        }
    }

    describe "clear" {
        it "empties the store" {
            ledger.append(input("Alpha", "30 min", "a")).expect("Failed to save");
            ledger.clear().expect("Failed to clear");
            assert!(ledger.list().is_empty());
        }
    }

    describe "export" {
        it "writes pretty JSON with camelCase fields" {
            ledger.append(input("Alpha", "30 min", "a")).expect("Failed to save");

            let json = ledger.export_json().expect("Failed to export");
            assert!(json.contains("\n  {"));
            assert!(json.contains("\"timeWorked\": \"30 min\""));

            let parsed: Vec<LogEntry> = serde_json::from_str(&json).expect("Invalid JSON");
            assert_eq!(parsed, ledger.list());
        }

        it "writes one CSV row per entry in ledger order" {
            ledger.append(input("Alpha", "30 min", "older")).expect("Failed to save");
            ledger.append(input("Beta", "90 min", "newer, with comma")).expect("Failed to save");

            let csv = ledger.export_csv();
            let lines: Vec<&str> = csv.lines().collect();
            assert_eq!(lines.len(), 3);
            assert_eq!(lines[0], "Fecha,Proyecto,Tiempo,Logro,Evidencia");
            assert!(lines[1].contains("\"newer, with comma\""));
            assert!(lines[2].contains("\"older\""));
        }
    }

    describe "query" {
        it "filters by exact project and sorts by date" {
            let now = at("2025-10-01T12:00:00Z");
            ledger.append_at(input("Alpha", "30 min", "old"), now - Duration::days(3)).expect("Failed to save");
            ledger.append_at(input("Alpha app", "30 min", "other"), now - Duration::days(2)).expect("Failed to save");
            ledger.append_at(input("Alpha", "30 min", "new"), now - Duration::days(1)).expect("Failed to save");

            let found = ledger.query(&EntryQuery {
                project: Some("Alpha".to_string()),
                ..Default::default()
            });
            let achievements: Vec<&str> = found.iter().map(|e| e.achievement.as_str()).collect();
            assert_eq!(achievements, vec!["new", "old"]);
        }

        it "sorts by project name ignoring case" {
            ledger.append(input("beta", "30 min", "b")).expect("Failed to save");
            ledger.append(input("Alpha", "30 min", "a")).expect("Failed to save");
            ledger.append(input("Gamma", "30 min", "g")).expect("Failed to save");

            let found = ledger.query(&EntryQuery {
                sort: SortBy::Project,
                ..Default::default()
            });
            let projects: Vec<&str> = found.iter().map(|e| e.project.as_str()).collect();
            assert_eq!(projects, vec!["Alpha", "beta", "Gamma"]);
        }

        it "lists distinct projects in first-seen order" {
            ledger.append(input("Alpha", "30 min", "a")).expect("Failed to save");
            ledger.append(input("Beta", "30 min", "b")).expect("Failed to save");
            ledger.append(input("Alpha", "30 min", "c")).expect("Failed to save");

            assert_eq!(ledger.projects(), vec!["Alpha".to_string(), "Beta".to_string()]);
        }
    }
}
