//! Whole-document round trips through the repository XML format

use chrono::{TimeZone, Utc};
use weblounge_common::codec::{decode_page, encode_page};
use weblounge_common::{
    Composer, Lock, LocaleVariant, PageDocument, Pagelet, ResourceVersion, Stamp, User,
};

fn stamp(login: &str) -> Stamp {
    Stamp::new(
        User::new(login).with_name(login.to_uppercase()).with_realm("weblounge"),
        Utc.with_ymd_and_hms(2012, 3, 1, 12, 0, 0).unwrap(),
    )
}

fn pagelet(id: &str, title: &str) -> Pagelet {
    let mut pagelet = Pagelet::new("text", id).created_by(stamp("amelie"));
    pagelet.set_property("align", vec!["left".into()]);
    pagelet.set_property("multi", vec!["x".into(), "y".into(), "x".into()]);

    let mut de = LocaleVariant::new("de");
    de.original = true;
    de.modified = Some(stamp("amelie"));
    de.text.insert("title".into(), vec![title.into()]);
    de.text.insert("lines".into(), vec!["one".into(), " two ".into()]);
    pagelet.locale.upsert(de);

    let mut fr = LocaleVariant::new("fr");
    fr.text.insert("title".into(), vec![format!("{title} (fr)")]);
    pagelet.locale.upsert(fr);
    pagelet
}

fn sample_page() -> PageDocument {
    let mut page = PageDocument::new("4bb19980-8f98-4873-a813-000000000006", ResourceVersion::Work)
        .with_path("/products/")
        .with_composer(Composer {
            id: "main".into(),
            pagelets: vec![
                pagelet("title", "Produkte"),
                Pagelet::new("text", "paragraph"),
                pagelet("title", "Zubehör & <Ersatzteile>"),
            ],
        })
        .with_composer(Composer::new("empty"));
    page.template = Some("default".into());
    page.metadata.title.insert("de".into(), "Produkte".into());
    page.metadata.description.insert("en".into(), "Our products".into());
    page.metadata.subjects = vec!["shop".into(), "catalog".into()];
    page.created = Some(stamp("amelie"));
    page.modified = Some(stamp("bob"));
    page.lock = Some(Lock {
        user: User::new("bob").with_name("Bob"),
        since: Some(Utc.with_ymd_and_hms(2012, 3, 2, 9, 0, 0).unwrap()),
    });
    page
}

#[test]
fn test_page_survives_round_trip() {
    let page = sample_page();
    let xml = encode_page(&page).unwrap();
    let decoded = decode_page(&xml).unwrap().expect("page element");
    assert_eq!(decoded, page);
}

#[test]
fn test_pagelet_order_is_preserved() {
    let page = sample_page();
    let decoded = decode_page(&encode_page(&page).unwrap()).unwrap().unwrap();

    let ids: Vec<_> = decoded.composer("main").unwrap().pagelets.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["title", "paragraph", "title"]);
    assert_eq!(
        decoded.composer("main").unwrap().pagelets[2].locale.get("de").unwrap().text_at("title", 0),
        Some("Zubehör & <Ersatzteile>")
    );
    assert!(decoded.composer("empty").unwrap().is_empty());
}

#[test]
fn test_etag_is_not_part_of_the_document() {
    let mut page = sample_page();
    page.etag = Some("\"1330603200000\"".into());
    let xml = encode_page(&page).unwrap();
    assert!(!xml.contains("1330603200000"));
    assert_eq!(decode_page(&xml).unwrap().unwrap().etag, None);
}

#[test]
fn test_duplicate_original_flags_are_collapsed_on_read() {
    let xml = r#"<page id="p" version="work"><body><composer id="c">
        <pagelet module="m" id="i">
          <locale language="de" original="true"/>
          <locale language="en" original="true"/>
        </pagelet></composer></body></page>"#;
    let page = decode_page(xml).unwrap().unwrap();
    let pagelet = &page.composer("c").unwrap().pagelets[0];
    assert_eq!(pagelet.locale.iter().filter(|v| v.original).count(), 1);
    assert_eq!(pagelet.locale.original().unwrap().language, "de");
}

#[test]
fn test_keys_without_values_survive_round_trip() {
    let mut pagelet = Pagelet::new("list", "tags");
    pagelet.set_property("tags", vec![]);
    pagelet.set_property("align", vec!["left".into()]);
    let mut en = LocaleVariant::new("en");
    en.original = true;
    en.text.insert("choices".into(), vec![]);
    pagelet.locale.upsert(en);

    let page = PageDocument::new("p", ResourceVersion::Work).with_composer(Composer {
        id: "main".into(),
        pagelets: vec![pagelet.clone()],
    });
    let xml = encode_page(&page).unwrap();
    assert!(xml.contains(r#"<property id="tags"/>"#));

    let decoded = decode_page(&xml).unwrap().unwrap();
    let round = &decoded.composer("main").unwrap().pagelets[0];
    assert_eq!(round.property("tags"), Some(&[][..]));
    assert_eq!(round.locale.get("en").unwrap().text("choices"), Some(&[][..]));
    assert_eq!(round, &pagelet);
}
