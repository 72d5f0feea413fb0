mod common;

use archive_search::collation::{Alphabet, Collator, RecalculationMode, TokenKind};
use archive_search::engine::SearchEngine;
use archive_search::{
    ArchiveConfig, Entity, IndexKind, RecordKind, SearchRequest, SystemOfRecord, Visibility,
    collate,
};

use common::{Harness, site, word};

fn dictionary_title(harness: &Harness, id: &str) -> archive_search::Result<(String, String)> {
    match harness.store.fetch(RecordKind::DictionaryEntry, id)? {
        Some(Entity::DictionaryEntry(entry)) => Ok((entry.meta.title, entry.custom_order)),
        other => panic!("expected a dictionary entry, got {other:?}"),
    }
}

#[test]
fn test_confusables_are_cleaned_before_keying() -> archive_search::Result<()> {
    let alphabet = Alphabet::from_graphemes("s1", ["a", "b"]).with_confusable("á", "a");

    let collation = collate(&alphabet, "áaá")?;
    assert_eq!(collation.cleaned_title, "aaa");
    assert_eq!(collation.order_key, "!!!");
    assert!(collation.is_title_updated);
    assert!(!collation.has_unknown());

    let collator = Collator::new(&alphabet)?;
    assert_eq!(collator.characters(&collation.cleaned_title), vec!["a", "a", "a"]);

    // Already clean titles are not reported as updated.
    assert!(!collate(&alphabet, "ab")?.is_title_updated);

    Ok(())
}

#[test]
fn test_confusable_to_variant_sorts_as_base() -> archive_search::Result<()> {
    let alphabet = Alphabet::from_graphemes("s1", ["a", "b"])
        .with_variant("A", "a")
        .with_confusable("ᐱ", "A");
    let collator = Collator::new(&alphabet)?;

    let collation = collator.clean("ᐱᐱᐱ");
    assert_eq!(collation.cleaned_title, "AAA");
    assert_eq!(collation.order_key, "!!!");

    let tokens = collator.tokenize(&collation.cleaned_title);
    assert_eq!(tokens.len(), 3);
    assert!(tokens.iter().all(|t| t.kind == TokenKind::Variant(1)));

    Ok(())
}

#[test]
fn test_preview_reports_without_persisting() -> archive_search::Result<()> {
    // 1. Three words: one with a confusable, one already keyed, one with an unknown grapheme
    let s1 = site("s1", Visibility::Public);
    let harness = Harness::seeded(
        ArchiveConfig::default(),
        vec![
            Entity::DictionaryEntry(word("1", &s1, "áb", "")),
            Entity::DictionaryEntry(word("2", &s1, "ba", "#!")),
            Entity::DictionaryEntry(word("3", &s1, "abzz", "")),
        ],
    )?;
    harness
        .store
        .set_alphabet(Alphabet::from_graphemes("s1", ["a", "b"]).with_confusable("á", "a"));

    // 2. Preview
    let report = harness.service.recalculate("s1", RecalculationMode::Preview)?;
    let changed: Vec<&str> = report.changed_ids().map(String::as_str).collect();
    assert_eq!(changed, vec!["1", "3"]);
    assert_eq!(report.unknown_character_count.get("z"), Some(&2));

    let first = &report.updated_entries[0];
    assert!(first.is_title_updated);
    assert_eq!(first.cleaned_title, "ab");
    assert_eq!(first.new_custom_order, "!#");

    // 3. Nothing was written
    assert_eq!(dictionary_title(&harness, "1")?, ("áb".to_string(), String::new()));
    assert!(
        harness
            .service
            .latest_recalculation("s1", RecalculationMode::Preview)
            .is_some()
    );
    assert!(
        harness
            .service
            .latest_recalculation("s1", RecalculationMode::Commit)
            .is_none()
    );

    Ok(())
}

#[test]
fn test_commit_persists_and_reindexes() -> archive_search::Result<()> {
    // 1. Seed and index words with stale keys
    let s1 = site("s1", Visibility::Public);
    let harness = Harness::seeded(
        ArchiveConfig::default(),
        vec![
            Entity::DictionaryEntry(word("1", &s1, "áb", "")),
            Entity::DictionaryEntry(word("2", &s1, "ba", "")),
            Entity::DictionaryEntry(word("3", &s1, "abz", "")),
        ],
    )?;
    harness
        .store
        .set_alphabet(Alphabet::from_graphemes("s1", ["a", "b"]).with_confusable("á", "a"));

    // 2. Commit
    let report = harness.service.recalculate("s1", RecalculationMode::Commit)?;
    assert_eq!(report.updated_entries.len(), 3);

    // 3. The store holds the cleaned title and key
    assert_eq!(
        dictionary_title(&harness, "1")?,
        ("ab".to_string(), "!#".to_string())
    );
    assert_eq!(dictionary_title(&harness, "2")?.1, "#!");

    // 4. The index followed
    let alias = harness
        .service
        .manager()
        .registry()
        .alias(IndexKind::DictionaryEntry);
    let indexed = harness
        .engine
        .get_document(&alias, "dictionary_entry:1")?
        .expect("entry 1 is indexed");
    assert_eq!(indexed.text("custom_order"), Some("!#"));
    assert_eq!(indexed.text("title"), Some("ab"));

    let unknown = harness
        .engine
        .get_document(&alias, "dictionary_entry:3")?
        .expect("entry 3 is indexed");
    assert_eq!(unknown.boolean("has_unrecognized_chars"), Some(true));

    // 5. Starts-with now filters on the alphabet order
    let request = SearchRequest::builder()
        .site("s1")
        .starts_with("b")
        .build();
    let page = harness.service.search(&request)?;
    let ids: Vec<&str> = page.results.iter().map(|r| r.entry.id()).collect();
    assert_eq!(ids, vec!["2"]);

    Ok(())
}

#[test]
fn test_saved_titles_are_collated_before_indexing() -> archive_search::Result<()> {
    // 1. A site alphabet, then a word saved with a stale key
    let s1 = site("s1", Visibility::Public);
    let harness = Harness::seeded(ArchiveConfig::default(), vec![Entity::Site(s1.clone())])?;
    harness
        .store
        .set_alphabet(Alphabet::from_graphemes("s1", ["a", "b"]).with_confusable("á", "a"));
    harness
        .store
        .upsert(Entity::DictionaryEntry(word("1", &s1, "bá", "")));

    // 2. Syncing indexes the cleaned title and a fresh key
    harness
        .service
        .sync_in_index(RecordKind::DictionaryEntry, "1")?;
    let alias = harness
        .service
        .manager()
        .registry()
        .alias(IndexKind::DictionaryEntry);
    let indexed = harness
        .engine
        .get_document(&alias, "dictionary_entry:1")?
        .expect("entry 1 is indexed");
    assert_eq!(indexed.text("title"), Some("ba"));
    assert_eq!(indexed.text("custom_order"), Some("#!"));

    let starts_with_b = SearchRequest::builder()
        .site("s1")
        .starts_with("b")
        .build();
    let ids: Vec<String> = harness
        .service
        .search(&starts_with_b)?
        .results
        .iter()
        .map(|r| r.entry.id().to_string())
        .collect();
    assert_eq!(ids, vec!["1"]);

    // 3. The save step cleans an edited title before it is committed
    let mut edited = word("1", &s1, "áb", "#!");
    let collation = harness.service.collate_entry(&mut edited)?;
    assert!(collation.is_title_updated);
    assert_eq!(edited.meta.title, "ab");
    assert_eq!(edited.custom_order, "!#");

    harness.store.upsert(Entity::DictionaryEntry(edited.clone()));
    harness
        .service
        .update_in_index(&Entity::DictionaryEntry(edited))?;
    let updated = harness
        .engine
        .get_document(&alias, "dictionary_entry:1")?
        .expect("entry 1 is indexed");
    assert_eq!(updated.text("custom_order"), Some("!#"));

    Ok(())
}
