//! Tests for the graph matching engine.

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::Arc;

    use serde_json::{json, Value};

    use crate::graph::{Graph, GraphBuilder, MatchOptions, Matcher, PhrasePart};
    use crate::language::english;
    use crate::values::Integer;

    fn matcher(graph: Arc<Graph>) -> Matcher {
        Matcher::new(english(), graph)
    }

    // ==================== Literal matching ====================

    #[test]
    fn test_literal_sequence() {
        let graph = GraphBuilder::new(english())
            .add("5 pm", |_| json!({"hour": 17}))
            .build();
        let matches = matcher(graph)
            .match_text("5 pm", MatchOptions::default())
            .unwrap()
            .into_sorted();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].data, json!({"hour": 17}));
        assert_eq!(matches[0].index, 2);
        assert!(matches[0].is_complete());
    }

    #[test]
    fn test_no_match_is_not_an_error() {
        let graph = GraphBuilder::new(english())
            .add("5 pm", |_| json!(null))
            .build();
        let matches = matcher(graph)
            .match_text("tomorrow morning", MatchOptions::default())
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_empty_input_yields_no_matches() {
        let graph = GraphBuilder::new(english())
            .add("5 pm", |_| json!(null))
            .build();
        let matches = matcher(graph).match_text("", MatchOptions::default()).unwrap();
        assert!(matches.is_empty());
    }

    // ==================== Backtracking ====================

    #[test]
    fn test_siblings_do_not_leak_state() {
        let graph = GraphBuilder::new(english())
            .add("pay in cash", |_| json!("cash"))
            .add("pay in kind", |_| json!("kind"))
            .build();
        let matches = matcher(graph)
            .match_text("pay in kind", MatchOptions::default())
            .unwrap()
            .into_sorted();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].data, json!("kind"));
    }

    #[test]
    fn test_capture_stack_restored_between_siblings() {
        let graph = GraphBuilder::new(english())
            .add(
                [PhrasePart::value("n", Integer::new()), PhrasePart::text("apples")],
                |data| json!({"fruit": "apples", "n": data[0]["value"]}),
            )
            .add(
                [PhrasePart::value("n", Integer::new()), PhrasePart::text("oranges")],
                |data| json!({"fruit": "oranges", "n": data[0]["value"]}),
            )
            .build();
        let matches = matcher(graph)
            .match_text("5 oranges", MatchOptions::default())
            .unwrap()
            .into_sorted();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].data, json!({"fruit": "oranges", "n": 5}));
    }

    // ==================== Determinism ====================

    #[test]
    fn test_identical_runs_give_identical_ordered_results() {
        let lang = english();
        let inner = GraphBuilder::new(Arc::clone(&lang))
            .add("next week", |_| json!("week"))
            .add("next", |_| json!("next"))
            .build();
        let graph = GraphBuilder::new(Arc::clone(&lang))
            .add([PhrasePart::graph(Arc::clone(&inner))], |d| d[0].clone())
            .add(
                [PhrasePart::graph(inner), PhrasePart::text("week")],
                |d| json!([d[0], "week"]),
            )
            .add("next week", |_| json!("literal"))
            .build();
        let m = Matcher::new(lang, graph);

        let run = || -> Vec<(usize, Value, String)> {
            m.match_text("next week", MatchOptions::default())
                .unwrap()
                .into_sorted()
                .into_iter()
                .map(|m| (m.index, m.data, format!("{:.6}", m.metadata.score)))
                .collect()
        };
        let first = run();
        assert!(!first.is_empty());
        for _ in 0..5 {
            assert_eq!(run(), first);
        }
    }

    // ==================== Memoization ====================

    #[test]
    fn test_disabling_memo_does_not_change_results() {
        let lang = english();
        let item = GraphBuilder::new(Arc::clone(&lang))
            .add("sharp", |_| json!("sharp"))
            .build();
        // Two alternatives reach the same sub-graph at the same position, so
        // the second arrival replays the cached delegation
        let graph = GraphBuilder::new(Arc::clone(&lang))
            .add(
                [PhrasePart::text("5 pm"), PhrasePart::graph(Arc::clone(&item))],
                |d| json!({"via": "literal", "item": d[0]}),
            )
            .add(
                [
                    PhrasePart::value("n", Integer::new()),
                    PhrasePart::text("pm"),
                    PhrasePart::graph(item),
                ],
                |d| json!({"via": "value", "item": d.last()}),
            )
            .build();
        let m = Matcher::new(lang, graph);

        let collect = |use_memo: bool| -> Vec<(usize, Value)> {
            let options = MatchOptions {
                use_memo,
                ..MatchOptions::default()
            };
            m.match_text("5 pm sharp", options)
                .unwrap()
                .into_sorted()
                .into_iter()
                .map(|m| (m.index, m.data))
                .collect()
        };

        let memoized = collect(true);
        let unmemoized = collect(false);
        assert_eq!(memoized.len(), 2);
        assert_eq!(memoized, unmemoized);
    }

    // ==================== Reentrancy ====================

    #[test]
    fn test_self_referential_graph_terminates() {
        let graph = GraphBuilder::new(english())
            .add("go", |_| json!(1))
            .add([PhrasePart::text("go"), PhrasePart::self_ref()], |d| {
                json!(d[0].as_i64().unwrap_or(0) + 1)
            })
            .build();
        let matches = matcher(graph)
            .match_text("go go go", MatchOptions::default())
            .unwrap()
            .into_sorted();

        assert!(!matches.is_empty());
        // Nothing may consume past the end of the input
        for m in &matches {
            assert!(m.index <= 3);
        }
        // The full decomposition covers all three tokens
        assert!(matches.iter().any(|m| m.index == 3 && m.data == json!(3)));
    }

    // ==================== Punctuation ====================

    #[test]
    fn test_skip_punctuation_consumes_trailing_tokens() {
        let graph = GraphBuilder::new(english())
            .add("a b", |_| json!("ab"))
            .build();

        let matches = matcher(Arc::clone(&graph))
            .match_text("a , b", MatchOptions::default().skip_punctuation(true))
            .unwrap()
            .into_sorted();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].index, 3);

        let matches = matcher(graph)
            .match_text("a , b", MatchOptions::default())
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_sub_graph_offers_pre_punctuation_continuation() {
        let lang = english();
        let month = GraphBuilder::new(Arc::clone(&lang))
            .skip_punctuation()
            .add("march", |_| json!("march"))
            .build();
        // The outer grammar wants to own the period itself
        let graph = GraphBuilder::new(Arc::clone(&lang))
            .add(
                [PhrasePart::graph(month), PhrasePart::text(". now")],
                |d| json!({"month": d[0]}),
            )
            .build();

        let matches = Matcher::new(lang, graph)
            .match_text("march . now", MatchOptions::default())
            .unwrap()
            .into_sorted();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].index, 3);
    }

    // ==================== Fuzzy tolerance ====================

    #[test]
    fn test_fuzzy_skips_disposable_token_with_penalty() {
        let graph = GraphBuilder::new(english())
            .add("show orders", |_| json!("orders"))
            .build();
        let m = matcher(graph);

        // "me" is disposable and sits between the phrase words
        let fuzzy = m
            .match_text("show me orders", MatchOptions::default().fuzzy())
            .unwrap()
            .into_sorted();
        assert_eq!(fuzzy.len(), 1);
        assert_eq!(fuzzy[0].index, 3);

        let direct = m
            .match_text("show orders", MatchOptions::default().fuzzy())
            .unwrap()
            .into_sorted();
        assert!(direct[0].score() > fuzzy[0].score());

        // Without fuzzy the disposable token blocks the phrase
        let strict = m
            .match_text("show me orders", MatchOptions::default())
            .unwrap();
        assert!(strict.is_empty());
    }

    #[test]
    fn test_fuzzy_never_drops_meaningful_tokens() {
        let graph = GraphBuilder::new(english())
            .add("show orders", |_| json!("orders"))
            .build();
        let matches = matcher(graph)
            .match_text("show urgent orders", MatchOptions::default().fuzzy())
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_fuzzy_never_drops_the_final_token() {
        let graph = GraphBuilder::new(english())
            .add("show", |_| json!("show"))
            .build();
        // "me" is disposable but final, so it cannot be skipped away
        let matches = matcher(graph)
            .match_text("show me", MatchOptions::default().fuzzy().only_complete())
            .unwrap();
        assert!(matches.is_empty());
    }

    // ==================== Partial matching ====================

    #[test]
    fn test_partial_accepts_literal_awaiting_value() {
        let graph = GraphBuilder::new(english())
            .add(
                [PhrasePart::text("lights to"), PhrasePart::value("level", Integer::new())],
                |d| json!({"level": d.first().map(|c| c["value"].clone())}),
            )
            .build();
        let m = matcher(graph);

        let matches = m
            .match_text("lights to", MatchOptions::default().partial())
            .unwrap()
            .into_sorted();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].metadata.partial);

        let matches = m.match_text("lights to", MatchOptions::default()).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_partial_compares_half_typed_final_token() {
        let graph = GraphBuilder::new(english())
            .add("show orders", |_| json!("orders"))
            .build();
        let m = matcher(graph);

        let matches = m
            .match_text("show ord", MatchOptions::default().partial())
            .unwrap()
            .into_sorted();
        assert_eq!(matches.len(), 1);
        // A half-typed token scores below a fully typed one
        let complete = m
            .match_text("show orders", MatchOptions::default().partial())
            .unwrap()
            .into_sorted();
        assert!(complete[0].score() > matches[0].score());
    }

    // ==================== Selection ====================

    #[test]
    fn test_best_of_prefers_complete_interpretation() {
        let graph = GraphBuilder::new(english())
            .add("a", |_| json!("short"))
            .add("a b", |_| json!("long"))
            .build();
        let best = matcher(graph)
            .best("a b", MatchOptions::default().only_complete())
            .unwrap()
            .unwrap();
        assert_eq!(best.data, json!("long"));
    }

    #[test]
    fn test_on_match_overrides_result_sink() {
        let graph = GraphBuilder::new(english())
            .add("a", |_| json!("a"))
            .build();
        let seen = RefCell::new(Vec::new());
        let options = MatchOptions::default().on_match(|m| seen.borrow_mut().push(m.data.clone()));
        let matches = matcher(graph).match_text("a", options).unwrap();

        assert!(matches.is_empty());
        assert_eq!(seen.into_inner(), vec![json!("a")]);
    }

    // ==================== Sub-graph composition ====================

    #[test]
    fn test_combining_date_and_time_sub_graphs() {
        let lang = english();
        let date = GraphBuilder::new(Arc::clone(&lang))
            .name("date")
            .add("march 3rd", |_| json!({"month": 3, "day": 3}))
            .build();
        let time = GraphBuilder::new(Arc::clone(&lang))
            .name("time")
            .add("5 pm", |_| json!({"hour": 17}))
            .build();
        let graph = GraphBuilder::new(Arc::clone(&lang))
            .add(
                [
                    PhrasePart::graph(date),
                    PhrasePart::text("and"),
                    PhrasePart::graph(time),
                ],
                |d| json!({"date": d[0], "time": d[1]}),
            )
            .build();

        let matches = Matcher::new(lang, graph)
            .match_text("march 3rd and 5 pm", MatchOptions::default())
            .unwrap()
            .into_sorted();

        assert_eq!(matches.len(), 1);
        assert!(matches[0].is_complete());
        assert_eq!(
            matches[0].data,
            json!({"date": {"month": 3, "day": 3}, "time": {"hour": 17}})
        );
    }

    #[test]
    fn test_completion_penalty_prefers_larger_decompositions() {
        let lang = english();
        let word = GraphBuilder::new(Arc::clone(&lang))
            .add("alpha", |_| json!("alpha"))
            .add("beta", |_| json!("beta"))
            .add("alpha beta", |_| json!("alpha beta"))
            .build();
        // One delegation covering both tokens versus two chained delegations
        let graph = GraphBuilder::new(Arc::clone(&lang))
            .add([PhrasePart::graph(Arc::clone(&word))], |d| json!({"parts": 1, "head": d[0]}))
            .add(
                [PhrasePart::graph(Arc::clone(&word)), PhrasePart::graph(word)],
                |d| json!({"parts": 2, "head": d[0]}),
            )
            .build();

        let best = Matcher::new(lang, graph)
            .best("alpha beta", MatchOptions::default().only_complete())
            .unwrap()
            .unwrap();
        assert_eq!(best.data["parts"], json!(1));
    }

    #[test]
    fn test_admission_filter_rejects_sub_matches() {
        let lang = english();
        let amount = GraphBuilder::new(Arc::clone(&lang))
            .add([PhrasePart::value("n", Integer::new())], |d| {
                d[0]["value"].clone()
            })
            .build();
        let graph = GraphBuilder::new(Arc::clone(&lang))
            .add(
                [
                    PhrasePart::filtered_graph(amount, |v| v.as_i64().unwrap_or(0) >= 10),
                    PhrasePart::text("items"),
                ],
                |d| json!({"n": d[0]}),
            )
            .build();
        let m = Matcher::new(lang, graph);

        let matches = m.match_text("12 items", MatchOptions::default()).unwrap();
        assert_eq!(matches.len(), 1);

        let matches = m.match_text("5 items", MatchOptions::default()).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_map_results_shapes_final_payload() {
        let graph = GraphBuilder::new(english())
            .add("5 pm", |_| json!(17))
            .map_results(|value| json!({"hour": value}))
            .build();
        let matches = matcher(graph)
            .match_text("5 pm", MatchOptions::default())
            .unwrap()
            .into_sorted();
        assert_eq!(matches[0].data, json!({"hour": 17}));
    }

    #[test]
    fn test_sub_graph_inherits_declared_defaults() {
        let lang = english();
        // The inner grammar declares punctuation skipping for itself
        let list = GraphBuilder::new(Arc::clone(&lang))
            .skip_punctuation()
            .add("a b", |_| json!("ab"))
            .build();
        let graph = GraphBuilder::new(Arc::clone(&lang))
            .add(
                [PhrasePart::graph(list), PhrasePart::text("done")],
                |d| d[0].clone(),
            )
            .build();

        // Punctuation inside the sub-graph span is consumed even though the
        // outer grammar does not skip punctuation
        let matches = Matcher::new(lang, graph)
            .match_text("a , b done", MatchOptions::default())
            .unwrap()
            .into_sorted();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].index, 4);
    }
}
