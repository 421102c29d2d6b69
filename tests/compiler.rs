mod common;
use crate::common::*;

use tierql::*;

#[test]
fn anchor_only() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let statement = corpus.compile(&corpus.query("phone")?)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)\nRETURN node_phone"
    );
    assert_eq!(
        statement.bound_aliases().into_iter().collect::<Vec<_>>(),
        vec!["node_phone"]
    );
    assert_eq!(statement.columns(), &["node_phone".to_string()]);
    assert_eq!(statement.mode(), StatementMode::Read);
    assert!(statement.parameters().is_empty());
    Ok(())
}

#[test]
fn single_following_reference() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus.query("phone")?.with_filter(Filter::new(
        ["phone", "following", "label"],
        Operator::Equals,
        "t",
    ));
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test), \
         (node_phone)-[:precedes]->(node_foll1_phone:phone:test)-[:is_a]->(type_node_foll1_phone:phone_type:test)\n\
         WHERE type_node_foll1_phone.label = $p0\n\
         RETURN node_phone"
    );
    assert!(!statement.text().contains('*'));
    assert!(statement.statement().iter().all(|clause| match clause {
        Clause::Match(patterns) => patterns.iter().all(|p| !p.has_variable_length()),
        _ => true,
    }));
    assert_eq!(statement.parameters().get("p0"), Some(&DataValue::from("t")));
    Ok(())
}

#[test]
fn adjacent_positions_reuse_bound_alias() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "previous"], Operator::NotEquals, DataValue::Null))
        .with_filter(Filter::new(
            ["phone", "previous", "previous"],
            Operator::NotEquals,
            DataValue::Null,
        ));
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test), \
         (node_phone)<-[:precedes]-(node_prev1_phone:phone:test), \
         (node_prev1_phone)<-[:precedes]-(node_prev2_phone:phone:test)\n\
         WHERE node_prev1_phone IS NOT NULL AND node_prev2_phone IS NOT NULL\n\
         RETURN node_phone"
    );
    assert!(!statement.text().contains('*'));
    Ok(())
}

#[test]
fn later_position_chains_from_earlier_filter() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let first = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "following", "following", "label"], Operator::Equals, "a"))
        .with_filter(Filter::new(["phone", "following", "begin"], Operator::GreaterThan, 1.0));
    let statement = corpus.compile(&first)?;
    assert!(statement
        .text()
        .contains("(node_foll1_phone)-[:precedes]->(node_foll2_phone:phone:test)"));
    assert!(!statement.text().contains('*'));
    Ok(())
}

#[test]
fn distant_position_uses_exact_length_path() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus.query("phone")?.with_filter(Filter::new(
        ["phone", "previous", "previous", "previous", "begin"],
        Operator::LessThan,
        2.5,
    ));
    let statement = corpus.compile(&intent)?;
    assert!(statement
        .text()
        .contains("(node_phone)<-[:precedes*3..3]-(node_prev3_phone:phone:test)"));
    assert!(statement.text().contains("WHERE node_prev3_phone.begin < $p0"));
    Ok(())
}

#[test]
fn column_only_reference_is_optional() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus.query("phone")?.with_column(Column::new(
        ["phone", "following", "following", "label"],
        "following_label",
    ));
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)\n\
         WITH node_phone\n\
         OPTIONAL MATCH (node_phone)-[:precedes*2..2]->(node_foll2_phone:phone:test)-[:is_a]->(type_node_foll2_phone:phone_type:test)\n\
         RETURN type_node_foll2_phone.label AS following_label"
    );
    assert_eq!(statement.columns(), &["following_label".to_string()]);
    Ok(())
}

#[test]
fn column_next_to_required_position() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "following", "begin"], Operator::GreaterThan, 0.5))
        .with_column(Column::from_path(["phone", "following", "following", "begin"]));
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test), (node_phone)-[:precedes]->(node_foll1_phone:phone:test)\n\
         WHERE node_foll1_phone.begin > $p0\n\
         WITH node_foll1_phone\n\
         OPTIONAL MATCH (node_foll1_phone)-[:precedes]->(node_foll2_phone:phone:test)\n\
         RETURN node_foll2_phone.begin AS phone_following_following_begin"
    );
    Ok(())
}

#[test]
fn optional_annotation_keeps_rows() -> Result<(), QueryError> {
    //the store returns a row for the last phone of the corpus, without a following phone
    let corpus = setup_corpus()?;
    let store = MockStore::new().with_discourse(
        "d1",
        table(&["label", "following_label"], &[&[DataValue::from("t"), DataValue::Null]])?,
    );
    let intent = corpus
        .query("phone")?
        .with_column(Column::new(["phone", "label"], "label"))
        .with_column(Column::new(["phone", "following", "label"], "following_label"))
        .with_discourse("d1");
    let statement = corpus.compile(&intent)?;
    assert!(statement.text().contains("OPTIONAL MATCH (node_phone)-[:precedes]->"));
    let results = corpus.execute(&intent, &store)?;
    assert_eq!(results.len(), 1);
    assert_eq!(results.get(0, "following_label"), Some(&DataValue::Null));
    Ok(())
}

#[test]
fn alignment_symmetry() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let forward = Filter::new(
        ["word", "begin"],
        Operator::Equals,
        AttributePath::from(["utterance", "begin"]),
    );
    let backward = Filter::new(
        ["utterance", "begin"],
        Operator::Equals,
        AttributePath::from(["word", "begin"]),
    );
    assert!(forward.is_alignment());
    assert!(backward.is_alignment());
    let a = corpus.compile(&corpus.query("word")?.with_filter(forward))?;
    let b = corpus.compile(&corpus.query("word")?.with_filter(backward))?;
    assert_eq!(a.text(), b.text());
    assert!(a
        .text()
        .contains("(node_word)-[:contained_by]->(node_word_utterance:utterance:test)"));
    assert!(a
        .text()
        .contains("WHERE node_word.begin = node_word_utterance.begin"));
    Ok(())
}

#[test]
fn alignment_relations_are_normalised() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus.query("phone")?.with_filter(Filter::aligned(
        ["phone"],
        Alignment::NotRightAligned,
        ["phone", "syllable"],
    ));
    let statement = corpus.compile(&intent)?;
    assert!(statement
        .text()
        .contains("(node_phone)-[:contained_by]->(node_phone_syllable:syllable:test)"));
    assert!(statement
        .text()
        .contains("WHERE node_phone.end <> node_phone_syllable.end"));
    Ok(())
}

#[test]
fn comparison_operand_order_is_canonical() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let a = corpus.compile(&corpus.query("phone")?.with_filter(Filter::new(
        ["phone", "word", "end"],
        Operator::GreaterThan,
        AttributePath::from(["phone", "end"]),
    )))?;
    let b = corpus.compile(&corpus.query("phone")?.with_filter(Filter::new(
        ["phone", "end"],
        Operator::LessThan,
        AttributePath::from(["phone", "word", "end"]),
    )))?;
    assert_eq!(a.text(), b.text());
    assert!(a.text().contains("node_phone.end < node_phone_word.end"));
    assert!(a
        .text()
        .contains("(node_phone)-[:contained_by*2..2]->(node_phone_word:word:test)"));
    Ok(())
}

#[test]
fn last_mutation_wins() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let mut intent = corpus.query("phone")?;
    intent
        .filter(Filter::new(["phone", "label"], Operator::Equals, "sil"))
        .set_properties([("checked", true)])
        .delete();
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)-[:is_a]->(type_node_phone:phone_type:test)\n\
         WHERE type_node_phone.label = $p0\n\
         DETACH DELETE node_phone"
    );
    assert!(!statement.text().contains("SET"));
    assert_eq!(statement.mode(), StatementMode::Write);
    assert!(statement.columns().is_empty());
    Ok(())
}

#[test]
fn projection_replaces_mutation() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_delete()
        .with_column(Column::from_path(["phone", "begin"]));
    let statement = corpus.compile(&intent)?;
    assert!(!statement.text().contains("DELETE"));
    assert_eq!(statement.columns(), &["phone_begin".to_string()]);
    Ok(())
}

#[test]
fn set_and_remove_properties() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let mut intent = corpus.query("phone")?;
    intent.set_properties([
        ("checked", DataValue::from(true)),
        ("note", DataValue::Null),
    ]);
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)\n\
         SET node_phone.checked = $p0\n\
         WITH node_phone\n\
         REMOVE node_phone.note"
    );
    assert_eq!(statement.parameters().get("p0"), Some(&DataValue::Bool(true)));
    Ok(())
}

#[test]
fn set_type_properties() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let mut intent = corpus.query("word")?;
    intent
        .set_type_properties([("transcription", "k.æ.t")])
        .set_properties([("frequency", 12.0)]);
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_word:word:test)-[:is_a]->(type_node_word:word_type:test)\n\
         SET node_word.frequency = $p0, type_node_word.transcription = $p1"
    );
    Ok(())
}

#[test]
fn invalid_mutations() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let mut intent = corpus.query("phone")?;
    intent.set_properties([("checked", true), ("checked", false)]);
    assert!(matches!(
        corpus.compile(&intent),
        Err(QueryError::InvalidMutationCombination(_))
    ));

    let mut intent = corpus.query("phone")?;
    intent.set_properties(Vec::<(String, DataValue)>::new());
    assert!(matches!(
        corpus.compile(&intent),
        Err(QueryError::InvalidMutationCombination(_))
    ));

    let mut intent = corpus.query("phone")?;
    intent.remove_labels(Vec::<String>::new());
    assert!(matches!(
        corpus.compile(&intent),
        Err(QueryError::InvalidMutationCombination(_))
    ));

    //repeating an identical assignment is harmless
    let mut intent = corpus.query("phone")?;
    intent.set_properties([("checked", true), ("checked", true)]);
    let statement = corpus.compile(&intent)?;
    assert_eq!(statement.parameters().len(), 1);
    Ok(())
}

#[test]
fn labels() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let mut intent = corpus.query("phone")?;
    intent.set_labels(["checked"]).set_type_labels(["stop"]);
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)-[:is_a]->(type_node_phone:phone_type:test)\n\
         SET node_phone:checked, type_node_phone:stop"
    );

    let mut intent = corpus.query("phone")?;
    intent.remove_labels(["checked"]);
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)\nREMOVE node_phone:checked"
    );
    Ok(())
}

#[test]
fn subset_filters() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "subset"], Operator::Equals, "stop"))
        .with_filter(Filter::new(
            ["phone", "syllable", "subset"],
            Operator::NotEquals,
            "stressed",
        ));
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)-[:is_a]->(type_node_phone:phone_type:test), \
         (node_phone)-[:contained_by]->(node_phone_syllable:syllable:test)\n\
         WHERE type_node_phone:stop AND NOT (node_phone_syllable:stressed)\n\
         RETURN node_phone"
    );

    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "subset"], Operator::Equals, "fricative"));
    assert!(matches!(
        corpus.compile(&intent),
        Err(QueryError::InvalidFilter(_))
    ));
    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "subset"], Operator::Equals, 3));
    assert!(matches!(
        corpus.compile(&intent),
        Err(QueryError::InvalidFilter(_))
    ));
    Ok(())
}

#[test]
fn null_and_list_literals() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "id"], Operator::Equals, DataValue::Null))
        .with_filter(Filter::new(["phone", "label"], Operator::NotIn, vec!["p", "t"]))
        .with_filter(Filter::new(["phone", "label"], Operator::Regex, "^[aeiou]"));
    let statement = corpus.compile(&intent)?;
    assert!(statement.text().contains(
        "WHERE node_phone.id IS NULL AND NOT (type_node_phone.label IN $p0) AND type_node_phone.label =~ $p1"
    ));
    assert_eq!(
        statement.parameters().get("p0"),
        Some(&DataValue::from(vec!["p", "t"]))
    );
    Ok(())
}

#[test]
fn inlined_literals() -> Result<(), QueryError> {
    let corpus = setup_corpus()?.with_config(Config::default().with_parameterize(false));
    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "label"], Operator::Equals, "it's ok"))
        .with_filter(Filter::new(["phone", "begin"], Operator::GreaterThanOrEqual, 3.0))
        .with_filter(Filter::new(["phone", "label"], Operator::In, vec!["a", "b"]));
    let statement = corpus.compile(&intent)?;
    assert!(statement.parameters().is_empty());
    assert!(statement.text().contains(
        r"WHERE type_node_phone.label = 'it\'s ok' AND node_phone.begin >= 3.0 AND type_node_phone.label IN ['a', 'b']"
    ));
    Ok(())
}

#[test]
fn invalid_regex_is_rejected() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "label"], Operator::Regex, "(unclosed"));
    assert!(matches!(
        corpus.compile(&intent),
        Err(QueryError::InvalidFilter(_))
    ));
    Ok(())
}

#[test]
fn subannotation_filters_are_required() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "burst", "amplitude"], Operator::GreaterThan, 0.5))
        .with_column(Column::new(["phone", "burst", "begin"], "burst_begin"));
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test), (node_phone)<-[:annotates]-(node_phone_burst:burst:test)\n\
         WHERE node_phone_burst.amplitude > $p0\n\
         RETURN node_phone_burst.begin AS burst_begin"
    );
    Ok(())
}

#[test]
fn subannotation_columns_are_optional() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_column(Column::new(["phone", "burst", "amplitude"], "amplitude"));
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)\n\
         WITH node_phone\n\
         OPTIONAL MATCH (node_phone)<-[:annotates]-(node_phone_burst:burst:test)\n\
         RETURN node_phone_burst.amplitude AS amplitude"
    );
    Ok(())
}

#[test]
fn speaker_and_discourse() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("word")?
        .with_filter(Filter::new(["word", "speaker", "gender"], Operator::Equals, "f"))
        .with_discourse("d1")
        .with_column(Column::new(["word", "speaker"], "speaker"));
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_word:word:test), \
         (node_word)-[:spoken_by]->(node_word_speaker:Speaker:test), \
         (node_word)-[:spoken_in]->(node_word_discourse:Discourse:test)\n\
         WHERE node_word_speaker.gender = $p0 AND node_word_discourse.name = $p1\n\
         RETURN node_word_speaker.name AS speaker"
    );
    assert_eq!(statement.parameters().get("p1"), Some(&DataValue::from("d1")));
    Ok(())
}

#[test]
fn pause_skipping_precedence() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus.query("word")?.with_filter(Filter::new(
        ["word", "previous_pause", "frequency"],
        Operator::GreaterThan,
        100.0,
    ));
    let statement = corpus.compile(&intent)?;
    assert!(statement
        .text()
        .contains("(node_word)<-[:precedes_pause]-(node_prevpause1_word:word:test)"));

    let intent = corpus.query("phone")?.with_filter(Filter::new(
        ["phone", "following_pause", "label"],
        Operator::Equals,
        "a",
    ));
    assert!(matches!(
        corpus.compile(&intent),
        Err(QueryError::InvalidPath(..))
    ));

    //the pause tier is configurable
    let corpus = setup_corpus()?.with_config(Config::default().with_pause_tier("phone"));
    assert!(corpus.compile(&intent).is_ok());
    Ok(())
}

#[test]
fn aggregates() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_group_by(Column::new(["phone", "label"], "label"))
        .with_aggregate(Aggregate::count("n"))
        .with_aggregate(Aggregate::new(
            AggregateFunction::Average,
            ["phone", "duration"],
            "mean_duration",
        ))
        .with_order_by(["n"], true)
        .with_limit(5);
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)\n\
         WITH node_phone\n\
         OPTIONAL MATCH (node_phone)-[:is_a]->(type_node_phone:phone_type:test)\n\
         RETURN type_node_phone.label AS label, count(node_phone) AS n, avg((node_phone.end - node_phone.begin)) AS mean_duration\n\
         ORDER BY n DESC"
    );
    assert_eq!(
        statement.columns(),
        &["label".to_string(), "n".to_string(), "mean_duration".to_string()]
    );

    let intent = corpus
        .query("phone")?
        .with_aggregate(Aggregate::count("n"))
        .with_order_by(["phone", "begin"], false);
    assert!(matches!(
        corpus.compile(&intent),
        Err(QueryError::InvalidPath(..))
    ));
    Ok(())
}

#[test]
fn distinct_ordered_limited_projection() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_column(Column::new(["phone", "word", "transcription"], "transcription"))
        .with_column(Column::new(["phone", "begin"], "begin"))
        .with_order_by(["phone", "word", "transcription"], false)
        .with_order_by(["begin"], true)
        .with_distinct()
        .with_limit(10);
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)\n\
         WITH node_phone\n\
         OPTIONAL MATCH (node_phone)-[:contained_by*2..2]->(node_phone_word:word:test)-[:is_a]->(type_node_phone_word:word_type:test)\n\
         RETURN DISTINCT type_node_phone_word.transcription AS transcription, node_phone.begin AS begin\n\
         ORDER BY transcription, begin DESC\n\
         LIMIT 10"
    );

    //after DISTINCT only returned columns can be ordered on
    let intent = corpus
        .query("phone")?
        .with_column(Column::new(["phone", "label"], "label"))
        .with_order_by(["phone", "end"], false)
        .with_distinct();
    assert!(matches!(
        corpus.compile(&intent),
        Err(QueryError::InvalidPath(..))
    ));

    //without DISTINCT any path can be ordered on
    let intent = corpus
        .query("phone")?
        .with_column(Column::new(["phone", "label"], "label"))
        .with_order_by(["phone", "end"], false);
    assert!(corpus
        .compile(&intent)?
        .text()
        .ends_with("ORDER BY node_phone.end"));
    Ok(())
}

#[test]
fn ordering_by_quoted_column_name() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_column(Column::new(["phone", "begin"], "phone begin"))
        .with_order_by(["phone begin"], true);
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_phone:phone:test)\n\
         RETURN node_phone.begin AS `phone begin`\n\
         ORDER BY `phone begin` DESC"
    );
    Ok(())
}

#[test]
fn lower_tier_columns() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("word")?
        .with_column(Column::new(["word", "phone", "label"], "phones"))
        .with_column(Column::new(["word", "syllable", "duration"], "syllable_durations"));
    let statement = corpus.compile(&intent)?;
    assert_eq!(
        statement.text(),
        "MATCH (node_word:word:test)\n\
         RETURN [(node_word)<-[:contained_by*2..2]-(node_word_phone:phone:test)-[:is_a]->(type_node_word_phone:phone_type:test) | type_node_word_phone.label] AS phones, \
         [(node_word)<-[:contained_by]-(node_word_syllable:syllable:test) | (node_word_syllable.end - node_word_syllable.begin)] AS syllable_durations"
    );

    let intent = corpus
        .query("word")?
        .with_filter(Filter::new(["word", "phone", "label"], Operator::Equals, "a"));
    assert!(matches!(
        corpus.compile(&intent),
        Err(QueryError::InvalidPath(..))
    ));
    Ok(())
}

#[test]
fn cache_mode() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "following", "label"], Operator::Equals, "t"))
        .with_cache();
    let statement = corpus.compile(&intent)?;
    assert_eq!(statement.mode(), StatementMode::Cache);
    assert!(statement.columns().is_empty());
    assert!(!statement.text().contains("RETURN"));
    assert!(statement
        .text()
        .ends_with("\nWITH node_phone, node_foll1_phone, type_node_foll1_phone"));
    Ok(())
}

#[test]
fn fingerprints() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = |label: &str| {
        QueryIntent::new("phone")
            .with_filter(Filter::new(["phone", "label"], Operator::Equals, label))
            .with_cache()
    };
    let a = corpus.compile(&intent("t"))?;
    let b = corpus.compile(&intent("t"))?;
    let c = corpus.compile(&intent("k"))?;
    assert_eq!(a, b);
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
    assert_eq!(a.fingerprint().len(), 40);
    assert!(a.fingerprint().chars().all(|c| c.is_ascii_hexdigit()));
    Ok(())
}

#[test]
fn unknown_tiers_and_paths() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    assert!(matches!(
        corpus.query("segment"),
        Err(QueryError::UnknownTier(_))
    ));
    assert!(matches!(
        corpus.compile(&QueryIntent::new("segment")),
        Err(QueryError::UnknownTier(_))
    ));
    let intent = corpus
        .query("phone")?
        .with_column(Column::from_path(["phone", "formants"]));
    let err = corpus.compile(&intent).unwrap_err();
    assert!(matches!(err, QueryError::InvalidPath(..)));
    assert!(err.is_compile_error());
    Ok(())
}

#[test]
fn compiler_is_deterministic() -> Result<(), QueryError> {
    let corpus = setup_corpus()?;
    let intent = corpus
        .query("syllable")?
        .with_filter(Filter::new(["syllable", "subset"], Operator::Equals, "stressed"))
        .with_filter(Filter::new(["syllable", "word", "frequency"], Operator::GreaterThan, 10.0))
        .with_column(Column::from_path(["syllable", "previous", "label"]))
        .with_column(Column::from_path(["syllable", "following", "label"]))
        .with_column(Column::from_path(["syllable", "utterance", "id"]));
    let first = corpus.compile(&intent)?;
    for _ in 0..10 {
        assert_eq!(corpus.compile(&intent)?.text(), first.text());
    }
    Ok(())
}

#[test]
fn corpus_from_json_file() -> Result<(), QueryError> {
    let dir = std::env::temp_dir();
    let filename = dir.join("tierql_hierarchy.json");
    std::fs::write(
        &filename,
        r#"{
            "corpus": "buckeye",
            "tiers": [
                { "name": "word", "type_properties": [ { "name": "transcription", "kind": "string" } ] },
                { "name": "phone", "type_subsets": [ "stop" ] }
            ],
            "speaker_properties": [ { "name": "age", "kind": "integer" } ]
        }"#,
    )
    .map_err(|e| QueryError::IOError(e, "tierql_hierarchy.json".to_string(), "writing fixture"))?;

    //relative names are resolved against the working directory
    let config = Config::default().with_workdir(dir.as_path());
    let corpus = Corpus::from_file("tierql_hierarchy.json", config)?;
    assert_eq!(corpus.name(), "buckeye");
    assert_eq!(corpus.hierarchy().depth_between("phone", "word")?, 1);
    let intent = corpus
        .query("phone")?
        .with_filter(Filter::new(["phone", "speaker", "age"], Operator::GreaterThan, 40));
    let statement = corpus.compile(&intent)?;
    assert!(statement
        .text()
        .contains("(node_phone)-[:spoken_by]->(node_phone_speaker:Speaker:buckeye)"));

    std::fs::write(&filename, r#"{ "corpus": "buckeye", "tiers": [] }"#)
        .map_err(|e| QueryError::IOError(e, "tierql_hierarchy.json".to_string(), "writing fixture"))?;
    assert!(matches!(
        Corpus::from_file("tierql_hierarchy.json", Config::default().with_workdir(dir.as_path())),
        Err(QueryError::HierarchyError(_))
    ));
    Ok(())
}
