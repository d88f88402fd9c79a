//! Tests for classifier module.

use super::*;
use serde_json::json;

fn commit_status(state: &str) -> Value {
    json!({
        "commit_status": {
            "state": state,
            "description": "3 tests failed",
            "url": "https://ci/1"
        },
        "repository": {"full_name": "t/r"},
        "actor": {"username": "ci-bot"}
    })
}

mod decision_table_tests {
    use super::*;

    #[test]
    fn test_declined_pull_request_is_always_a_failure() {
        let payloads = vec![
            json!({"pullrequest": {"id": 1}, "repository": {"full_name": "t/r"}}),
            json!({"pullrequest": {"id": 2, "title": ""}, "repository": {"name": "r"}}),
            json!({
                "pullrequest": {"id": 3, "title": "T", "author": {"username": "a"}},
                "repository": {"full_name": "t/r"},
                "actor": {"display_name": "A"}
            }),
        ];

        for payload in payloads {
            let record = classify("pullrequest:rejected", &payload)
                .unwrap_or_else(|| panic!("payload {} should classify", payload));
            assert_eq!(record.classification, Classification::PrDeclined);
        }
    }

    #[test]
    fn test_failed_commit_status_is_a_build_failure() {
        for event_type in ["repo:commit_status_updated", "repo:commit_status_created"] {
            let record = classify(event_type, &commit_status("FAILED")).unwrap();
            assert_eq!(record.classification, Classification::BuildFailed);
        }
    }

    #[test]
    fn test_non_failed_commit_states_are_ignored() {
        for event_type in ["repo:commit_status_updated", "repo:commit_status_created"] {
            for state in ["SUCCESSFUL", "INPROGRESS", "STOPPED", "failed", "Failed", ""] {
                assert_eq!(
                    classify(event_type, &commit_status(state)),
                    None,
                    "{} with state {:?}",
                    event_type,
                    state
                );
            }
        }
    }

    #[test]
    fn test_missing_state_is_ignored() {
        let payload = json!({
            "commit_status": {"description": "x"},
            "repository": {"full_name": "t/r"}
        });

        assert_eq!(classify("repo:commit_status_updated", &payload), None);
    }

    #[test]
    fn test_other_event_types_are_never_failures() {
        let failing_looking = commit_status("FAILED");
        let pr_looking = json!({"pullrequest": {"id": 1}, "repository": {"full_name": "t/r"}});

        for event_type in [
            "repo:push",
            "pullrequest:created",
            "pullrequest:fulfilled",
            "pullrequest:updated",
            "repo:commit_status",
            "PULLREQUEST:REJECTED",
            "",
        ] {
            assert_eq!(classify(event_type, &failing_looking), None);
            assert_eq!(classify(event_type, &pr_looking), None);
            assert_eq!(classify(event_type, &json!(null)), None);
        }
    }
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_scenario_declined_pull_request() {
        let payload = json!({
            "pullrequest": {
                "id": 42,
                "title": "Add X",
                "links": {"html": {"href": "https://x/42"}}
            },
            "repository": {"full_name": "t/r"},
            "actor": {"username": "bob"}
        });

        let record = classify("pullrequest:rejected", &payload).unwrap();

        assert_eq!(record.classification, Classification::PrDeclined);
        assert_eq!(record.repository, "t/r");
        assert_eq!(record.triggered_by, "bob");
        assert_eq!(record.link, "https://x/42");
        assert!(record.reason.contains("Add X"));
        assert_eq!(record.pipeline_or_pr_label, "PR #42");
        assert_eq!(record.branch, "unknown");
        assert_eq!(record.branch_source, BranchSource::Unknown);
    }

    #[test]
    fn test_scenario_failed_build() {
        let record = classify("repo:commit_status_updated", &commit_status("FAILED")).unwrap();

        assert_eq!(record.classification, Classification::BuildFailed);
        assert_eq!(record.reason, "3 tests failed");
        assert_eq!(record.link, "https://ci/1");
        assert_eq!(record.repository, "t/r");
        assert_eq!(record.triggered_by, "ci-bot");
        assert_eq!(record.pipeline_or_pr_label, "Pipeline");
    }

    #[test]
    fn test_scenario_successful_build_is_ignored() {
        assert_eq!(
            classify("repo:commit_status_updated", &commit_status("SUCCESSFUL")),
            None
        );
    }
}

mod pull_request_extraction_tests {
    use super::*;

    #[test]
    fn test_empty_title_falls_back_to_pr_label() {
        let payload = json!({
            "pullrequest": {"id": 9, "title": "  "},
            "repository": {"full_name": "t/r"}
        });

        let record = classify("pullrequest:rejected", &payload).unwrap();

        assert_eq!(record.reason, "Declined: PR #9");
    }

    #[test]
    fn test_decline_reason_is_appended() {
        let payload = json!({
            "pullrequest": {"id": 9, "title": "Add X", "reason": "Superseded by #10"},
            "repository": {"full_name": "t/r"}
        });

        let record = classify("pullrequest:rejected", &payload).unwrap();

        assert_eq!(record.reason, "Declined: Add X (Superseded by #10)");
    }

    #[test]
    fn test_repository_falls_back_to_short_name() {
        let payload = json!({
            "pullrequest": {"id": 1},
            "repository": {"name": "repo"}
        });

        assert_eq!(
            classify("pullrequest:rejected", &payload).unwrap().repository,
            "repo"
        );
    }

    #[test]
    fn test_author_used_when_actor_missing() {
        let payload = json!({
            "pullrequest": {"id": 1, "author": {"display_name": "Alice Author"}},
            "repository": {"full_name": "t/r"}
        });

        assert_eq!(
            classify("pullrequest:rejected", &payload).unwrap().triggered_by,
            "Alice Author"
        );
    }

    #[test]
    fn test_missing_people_fall_back_to_unknown() {
        let payload = json!({"pullrequest": {"id": 1}, "repository": {"full_name": "t/r"}});

        let record = classify("pullrequest:rejected", &payload).unwrap();

        assert_eq!(record.triggered_by, "unknown");
        assert_eq!(record.link, "");
    }

    #[test]
    fn test_source_branch_is_used() {
        let payload = json!({
            "pullrequest": {"id": 1, "source": {"branch": {"name": "feature/login"}}},
            "repository": {"full_name": "t/r"}
        });

        let record = classify("pullrequest:rejected", &payload).unwrap();

        assert_eq!(record.branch, "feature/login");
        assert_eq!(record.branch_source, BranchSource::PullRequestSource);
    }

    #[test]
    fn test_string_pull_request_id() {
        let payload = json!({"pullrequest": {"id": "17"}, "repository": {"full_name": "t/r"}});

        assert_eq!(
            classify("pullrequest:rejected", &payload)
                .unwrap()
                .pipeline_or_pr_label,
            "PR #17"
        );
    }
}

mod build_extraction_tests {
    use super::*;

    #[test]
    fn test_key_is_preferred_over_name() {
        let payload = json!({
            "commit_status": {"state": "FAILED", "key": "build-7", "name": "Nightly"},
            "repository": {"full_name": "t/r"}
        });

        let record = classify("repo:commit_status_created", &payload).unwrap();

        assert_eq!(record.pipeline_or_pr_label, "build-7");
    }

    #[test]
    fn test_name_used_without_key() {
        let payload = json!({
            "commit_status": {"state": "FAILED", "name": "Nightly"},
            "repository": {"full_name": "t/r"}
        });

        let record = classify("repo:commit_status_created", &payload).unwrap();

        assert_eq!(record.pipeline_or_pr_label, "Nightly");
    }

    #[test]
    fn test_defaults_for_missing_status_fields() {
        let payload = json!({
            "commit_status": {"state": "FAILED"},
            "repository": {"full_name": "t/r"}
        });

        let record = classify("repo:commit_status_updated", &payload).unwrap();

        assert_eq!(record.pipeline_or_pr_label, "Pipeline");
        assert_eq!(record.reason, "Build failed");
        assert_eq!(record.link, "");
        assert_eq!(record.triggered_by, "unknown");
        assert_eq!(record.branch, "unknown");
        assert_eq!(record.commit, None);
    }

    #[test]
    fn test_branch_from_heads_ref() {
        let payload = json!({
            "commit_status": {
                "state": "FAILED",
                "refname": "refs/heads/release/1.2",
                "commit": {"hash": "0123456789abcdef", "branch": "other"}
            },
            "repository": {"full_name": "t/r"}
        });

        let record = classify("repo:commit_status_updated", &payload).unwrap();

        assert_eq!(record.branch, "release/1.2");
        assert_eq!(record.branch_source, BranchSource::RefName);
        assert_eq!(record.commit.as_deref(), Some("0123456789abcdef"));
    }

    #[test]
    fn test_branch_from_tags_ref_and_plain_ref() {
        assert_eq!(
            branch_from_ref(Some("refs/tags/v1.0.0")).as_deref(),
            Some("v1.0.0")
        );
        assert_eq!(branch_from_ref(Some("main")).as_deref(), Some("main"));
        assert_eq!(branch_from_ref(Some("refs/heads/")), None);
        assert_eq!(branch_from_ref(Some("")), None);
        assert_eq!(branch_from_ref(None), None);
    }

    #[test]
    fn test_branch_from_commit_branch_field() {
        let payload = json!({
            "commit_status": {"state": "FAILED", "commit": {"hash": "abc", "branch": "develop"}},
            "repository": {"full_name": "t/r"}
        });

        let record = classify("repo:commit_status_updated", &payload).unwrap();

        assert_eq!(record.branch, "develop");
        assert_eq!(record.branch_source, BranchSource::CommitBranch);
    }

    #[test]
    fn test_branch_falls_back_to_short_hash() {
        let payload = json!({
            "commit_status": {"state": "FAILED", "commit": {"hash": "0123456789abcdef"}},
            "repository": {"full_name": "t/r"}
        });

        let record = classify("repo:commit_status_updated", &payload).unwrap();

        assert_eq!(record.branch, "0123456");
        assert_eq!(record.branch_source, BranchSource::CommitHash);
        assert!(record.branch_is_fallback());
    }

    #[test]
    fn test_repository_from_commit_status_object() {
        let payload = json!({
            "commit_status": {"state": "FAILED", "repository": {"full_name": "t/nested"}}
        });

        let record = classify("repo:commit_status_updated", &payload).unwrap();

        assert_eq!(record.repository, "t/nested");
    }
}

mod wrongly_typed_field_tests {
    use super::*;

    #[test]
    fn test_declined_pull_request_with_string_html_link() {
        let payload = json!({
            "pullrequest": {"id": 42, "title": "Add X", "links": {"html": "https://x/42"}},
            "repository": {"full_name": "t/r"},
            "actor": {"username": "bob"}
        });

        let record = classify("pullrequest:rejected", &payload).unwrap();

        assert_eq!(record.classification, Classification::PrDeclined);
        assert_eq!(record.repository, "t/r");
        assert_eq!(record.triggered_by, "bob");
        assert_eq!(record.link, "");
        assert!(record.reason.contains("Add X"));
    }

    #[test]
    fn test_numeric_title_falls_back_to_pr_label() {
        let payload = json!({
            "pullrequest": {"id": 42, "title": 7},
            "repository": {"full_name": "t/r"}
        });

        let record = classify("pullrequest:rejected", &payload).unwrap();

        assert_eq!(record.pipeline_or_pr_label, "PR #42");
        assert_eq!(record.reason, "Declined: PR #42");
        assert_eq!(record.triggered_by, UNKNOWN);
    }

    #[test]
    fn test_null_nested_pull_request_objects_fall_back() {
        let payload = json!({
            "pullrequest": {
                "id": 42,
                "title": "Add X",
                "links": null,
                "author": null,
                "source": {"branch": null}
            },
            "repository": {"full_name": "t/r"},
            "actor": null
        });

        let record = classify("pullrequest:rejected", &payload).unwrap();

        assert_eq!(record.link, "");
        assert_eq!(record.triggered_by, UNKNOWN);
        assert_eq!(record.branch, UNKNOWN);
        assert_eq!(record.branch_source, BranchSource::Unknown);
    }

    #[test]
    fn test_object_commit_branch_falls_back_to_short_hash() {
        let payload = json!({
            "commit_status": {
                "state": "FAILED",
                "commit": {"hash": "0123456789abcdef", "branch": {"name": "main"}}
            },
            "repository": {"full_name": "t/r"}
        });

        let record = classify("repo:commit_status_updated", &payload).unwrap();

        assert_eq!(record.branch, "0123456");
        assert_eq!(record.branch_source, BranchSource::CommitHash);
    }

    #[test]
    fn test_wrongly_typed_status_fields_use_defaults() {
        let payload = json!({
            "commit_status": {
                "state": "FAILED",
                "key": false,
                "description": {"text": "boom"},
                "url": 3,
                "refname": [],
                "commit": "abc"
            },
            "repository": {"full_name": "t/r"},
            "actor": "ci-bot"
        });

        let record = classify("repo:commit_status_updated", &payload).unwrap();

        assert_eq!(record.pipeline_or_pr_label, "Pipeline");
        assert_eq!(record.reason, "Build failed");
        assert_eq!(record.link, "");
        assert_eq!(record.branch, UNKNOWN);
        assert_eq!(record.triggered_by, UNKNOWN);
        assert_eq!(record.commit, None);
    }

    #[test]
    fn test_wrongly_typed_root_objects_still_hit_the_floor() {
        let pull_request = json!({"pullrequest": 42, "repository": {"full_name": "t/r"}});
        let build = json!({"commit_status": {"state": "FAILED"}, "repository": {"full_name": 1}});

        assert_eq!(classify("pullrequest:rejected", &pull_request), None);
        assert_eq!(classify("repo:commit_status_updated", &build), None);
    }
}

mod validation_floor_tests {
    use super::*;

    #[test]
    fn test_pull_request_without_pr_object_is_absent() {
        let payload = json!({"repository": {"full_name": "t/r"}, "actor": {"username": "bob"}});

        assert_eq!(classify("pullrequest:rejected", &payload), None);
    }

    #[test]
    fn test_pull_request_without_repository_is_absent() {
        let payload = json!({"pullrequest": {"id": 42, "title": "Add X"}});

        assert_eq!(classify("pullrequest:rejected", &payload), None);
    }

    #[test]
    fn test_pull_request_without_id_is_absent() {
        let payload = json!({"pullrequest": {"title": "Add X"}, "repository": {"full_name": "t/r"}});

        assert_eq!(classify("pullrequest:rejected", &payload), None);
    }

    #[test]
    fn test_commit_status_without_status_object_is_absent() {
        let payload = json!({"repository": {"full_name": "t/r"}});

        assert_eq!(classify("repo:commit_status_updated", &payload), None);
    }

    #[test]
    fn test_failed_build_without_repository_is_absent() {
        let payload = json!({"commit_status": {"state": "FAILED"}});

        assert_eq!(classify("repo:commit_status_updated", &payload), None);
    }

    #[test]
    fn test_wrongly_shaped_payloads_do_not_panic() {
        let payloads = vec![
            json!(null),
            json!([]),
            json!("text"),
            json!(12),
            json!({"pullrequest": "42"}),
            json!({"pullrequest": {"id": 1}, "repository": "t/r"}),
            json!({"commit_status": {"state": 1}}),
            json!({"commit_status": {"state": "FAILED", "commit": "abc"}}),
        ];

        for payload in payloads {
            for event_type in [
                "pullrequest:rejected",
                "repo:commit_status_updated",
                "repo:commit_status_created",
            ] {
                assert_eq!(classify(event_type, &payload), None, "{} {}", event_type, payload);
            }
        }
    }
}
