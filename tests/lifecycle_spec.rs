use chrono::{DateTime, Duration, Utc};
use progress_ledger::db::{keys, KeyValueStore, MemoryStore};
use progress_ledger::error::LifecycleError;
use progress_ledger::models::*;
use progress_ledger::tracker::Tracker;
use speculate2::speculate;
use uuid::Uuid;

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn session(project: &str, achievement: &str) -> CreateEntryInput {
    CreateEntryInput {
        date: None,
        project: project.to_string(),
        time_worked: "30 min".to_string(),
        achievement: achievement.to_string(),
        evidence: String::new(),
    }
}

speculate! {
    before {
        let store = MemoryStore::new();
        let tracker = Tracker::new(store.clone());
        let lifecycle = tracker.lifecycle();
        let now = at("2025-10-01T12:00:00Z");
    }

    describe "add_project" {
        it "starts a full countdown with the creation marker" {
            let project = lifecycle.add_project_at("Writing", now).expect("Failed to add");

            assert_eq!(project.name, "Writing");
            assert_eq!(project.days_left, 7);
            assert_eq!(project.last_progress, CREATED_MARKER);
            assert_eq!(project.last_progress_date, now);
            assert_eq!(lifecycle.state().active, vec![project]);
        }

        it "rejects a blank name" {
            let result = lifecycle.add_project_at("   ", now);
            assert!(matches!(result, Err(LifecycleError::Empty(_))));
            assert!(lifecycle.state().active.is_empty());
        }

        it "rejects a fourth project without changing state" {
            for name in ["One", "Two", "Three"] {
                lifecycle.add_project_at(name, now).expect("Failed to add");
            }
            let before = lifecycle.state();

            let result = lifecycle.add_project_at("Four", now);

            assert!(matches!(result, Err(LifecycleError::CapacityExceeded)));
            assert_eq!(lifecycle.state(), before);
            assert_eq!(lifecycle.state().active.len(), MAX_ACTIVE_PROJECTS);
        }
    }

    describe "remove_project" {
        it "records how many days had elapsed" {
            let project = lifecycle.add_project_at("Writing", now).expect("Failed to add");
            tracker
                .log_at(session("Writing", "Outline"), now - Duration::days(3))
                .expect("Failed to log");

            let dead = tracker
                .remove_project_at(project.id, now)
                .expect("Failed to remove")
                .expect("Project not found");

            assert_eq!(dead.name, "Writing");
            assert_eq!(dead.died_on_day, 3);
            assert!(!dead.expired());
            let state = lifecycle.state();
            assert!(state.active.is_empty());
            assert_eq!(state.dead, vec![dead]);
        }

        it "counts days up to the moment of removal after time away" {
            let project = tracker
                .add_project_at("Writing", now - Duration::days(6))
                .expect("Failed to add");
            tracker
                .log_at(session("Writing", "Draft"), now - Duration::days(5))
                .expect("Failed to log");
            assert_eq!(lifecycle.state().active[0].days_left, 7);

            let dead = tracker
                .remove_project_at(project.id, now)
                .expect("Failed to remove")
                .expect("Project not found");

            assert_eq!(dead.died_on_day, 5);
        }

        it "is a no-op for an unknown id" {
            lifecycle.add_project_at("Writing", now).expect("Failed to add");
            let before = lifecycle.state();

            assert!(lifecycle.remove_project(Uuid::new_v4()).expect("Failed").is_none());
            assert_eq!(lifecycle.state(), before);
        }

        it "keeps the dead history newest first" {
            let a = lifecycle.add_project_at("A", now).expect("Failed to add");
            let b = lifecycle.add_project_at("B", now).expect("Failed to add");
            lifecycle.remove_project(a.id).expect("Failed");
            lifecycle.remove_project(b.id).expect("Failed");

            let names: Vec<String> = lifecycle.state().dead.into_iter().map(|d| d.name).collect();
            assert_eq!(names, vec!["B".to_string(), "A".to_string()]);
        }
    }

    describe "recompute" {
        it "resets the countdown on matching progress" {
            lifecycle
                .add_project_at("Writing", now - Duration::days(5))
                .expect("Failed to add");
            tracker
                .log_at(session("writing: chapter 2", "2000 words"), now - Duration::days(1))
                .expect("Failed to log");

            let active = tracker.lifecycle_state_at(now).active;
            assert_eq!(active[0].days_left, 6);
            assert_eq!(active[0].last_progress, "2000 words");
        }

        it "expires a project whose last progress is eight days old" {
            lifecycle.add_project_at("Writing", now).expect("Failed to add");
            tracker
                .log_at(session("Writing", "Chapter one"), now - Duration::days(8))
                .expect("Failed to log");

            let state = tracker.lifecycle_state_at(now);

            assert!(state.active.iter().all(|p| p.name != "Writing"));
            assert_eq!(
                state.dead,
                vec![DeadProject {
                    name: "Writing".to_string(),
                    died_on_day: EXPIRED_SENTINEL_DAY,
                }]
            );
            assert_eq!(lifecycle.state(), state);
        }

        it "expires exactly at seven days" {
            lifecycle.add_project_at("Alpha", now).expect("Failed to add");
            tracker
                .log_at(session("Alpha", "x"), now - Duration::days(7))
                .expect("Failed to log");

            let result = lifecycle
                .recompute_at(&tracker.ledger().list(), now)
                .expect("Failed to recompute");
            assert_eq!(result.expired.len(), 1);
            assert!(result.state.active.is_empty());
        }

        it "does not age a project without matching entries" {
            lifecycle
                .add_project_at("Gardening", now - Duration::days(30))
                .expect("Failed to add");
            tracker.log_at(session("Writing", "x"), now).expect("Failed to log");

            let active = tracker.lifecycle_state_at(now).active;
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].days_left, 7);
        }

        it "is stable across repeated reads" {
            lifecycle.add_project_at("Alpha", now).expect("Failed to add");
            tracker
                .log_at(session("Alpha", "x"), now - Duration::days(2))
                .expect("Failed to log");

            let first = tracker.lifecycle_state_at(now);
            let second = tracker.lifecycle_state_at(now);
            assert_eq!(first, second);
        }

        it "still reports state when storage cannot be written" {
            lifecycle.add_project_at("Alpha", now).expect("Failed to add");
            tracker
                .log_at(session("Alpha", "x"), now - Duration::days(9))
                .expect("Failed to log");
            store.set_quota_exceeded(true);

            let state = tracker.lifecycle_state_at(now);
            assert!(state.active.is_empty());
            assert_eq!(state.dead[0].name, "Alpha");
            assert_eq!(lifecycle.state().active.len(), 1);
        }
    }

    describe "ideas" {
        it "rejects blank text" {
            assert!(matches!(lifecycle.add_idea(" \t "), Err(LifecycleError::Empty(_))));
            assert!(lifecycle.state().ideas.is_empty());
        }

        it "promotes an idea into a fresh project" {
            let idea = lifecycle.add_idea("  Podcast  ").expect("Failed to add");
            assert_eq!(idea.text, "Podcast");

            let project = lifecycle
                .promote_idea_at(idea.id, now)
                .expect("Failed to promote")
                .expect("Idea not found");

            assert_eq!(project.name, "Podcast");
            assert_eq!(project.days_left, 7);
            assert_eq!(project.last_progress, PROMOTED_MARKER);
            assert_eq!(project.last_progress_date, now);
            let state = lifecycle.state();
            assert!(state.ideas.is_empty());
            assert_eq!(state.active, vec![project]);
        }

        it "refuses promotion when the active set is full" {
            for name in ["One", "Two", "Three"] {
                lifecycle.add_project_at(name, now).expect("Failed to add");
            }
            let idea = lifecycle.add_idea("Four").expect("Failed to add");
            let before = lifecycle.state();

            let result = lifecycle.promote_idea_at(idea.id, now);

            assert!(matches!(result, Err(LifecycleError::CapacityExceeded)));
            assert_eq!(lifecycle.state(), before);
        }

        it "returns None when promoting an unknown idea" {
            assert!(lifecycle.promote_idea_at(Uuid::new_v4(), now).expect("Failed").is_none());
        }

        it "deletes idempotently" {
            let idea = lifecycle.add_idea("Podcast").expect("Failed to add");
            assert!(lifecycle.delete_idea(idea.id).expect("Failed"));
            assert!(!lifecycle.delete_idea(idea.id).expect("Failed"));
            assert!(lifecycle.state().ideas.is_empty());
        }
    }

    describe "capacity" {
        it "frees slots of projects that expired while away" {
            for name in ["Alpha", "Beta", "Gamma"] {
                tracker
                    .add_project_at(name, now - Duration::days(11))
                    .expect("Failed to add");
                tracker
                    .log_at(session(name, "x"), now - Duration::days(10))
                    .expect("Failed to log");
            }
            assert_eq!(lifecycle.state().active.len(), MAX_ACTIVE_PROJECTS);

            let project = tracker.add_project_at("Delta", now).expect("Failed to add");

            let state = lifecycle.state();
            assert_eq!(state.active, vec![project]);
            assert_eq!(state.dead.len(), 3);
            assert!(state.dead.iter().all(|d| d.expired()));
        }

        it "lets an idea take a slot freed by expiry" {
            for name in ["Alpha", "Beta", "Gamma"] {
                tracker
                    .add_project_at(name, now - Duration::days(11))
                    .expect("Failed to add");
            }
            tracker
                .log_at(session("Alpha", "x"), now - Duration::days(10))
                .expect("Failed to log");
            let idea = tracker.add_idea("Podcast").expect("Failed to add idea");

            let project = tracker
                .promote_idea_at(idea.id, now)
                .expect("Failed to promote")
                .expect("Idea not found");

            let names: Vec<String> = lifecycle.state().active.into_iter().map(|p| p.name).collect();
            assert_eq!(names, vec!["Beta".to_string(), "Gamma".to_string(), project.name]);
        }

        it "refuses to mutate when the lifecycle cannot be brought up to date" {
            store.set_unavailable(true);
            assert!(matches!(
                tracker.add_project_at("Alpha", now),
                Err(LifecycleError::Store(_))
            ));
            assert!(tracker.remove_project_at(Uuid::new_v4(), now).is_err());
        }

        it "never exceeds three across mixed additions and promotions" {
            let ideas: Vec<Idea> = (0..4)
                .map(|i| lifecycle.add_idea(&format!("Idea {}", i)).expect("Failed to add"))
                .collect();

            let mut accepted = 0;
            for (i, idea) in ideas.iter().enumerate() {
                let outcome = if i % 2 == 0 {
                    lifecycle.promote_idea_at(idea.id, now).map(|p| p.is_some())
                } else {
                    lifecycle.add_project_at(&format!("Project {}", i), now).map(|_| true)
                };
                if let Ok(true) = outcome {
                    accepted += 1;
                }
                assert!(lifecycle.state().active.len() <= MAX_ACTIVE_PROJECTS);
            }

            assert_eq!(accepted, 3);
        }
    }

    describe "storage" {
        it "treats malformed lifecycle data as empty" {
            store.set(keys::ACTIVE_PROJECTS, "not json").expect("Failed to write");
            assert!(lifecycle.state().active.is_empty());
            lifecycle.add_project_at("Fresh", now).expect("Failed to add");
            assert_eq!(lifecycle.state().active.len(), 1);
        }

        it "surfaces write failures as errors" {
            store.set_unavailable(true);
            assert!(matches!(
                lifecycle.add_project_at("Alpha", now),
                Err(LifecycleError::Store(_))
            ));
            assert!(matches!(lifecycle.add_idea("Alpha"), Err(LifecycleError::Store(_))));
        }
    }
}
