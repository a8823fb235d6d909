//! # Page Document Codec
//!
//! Structural mapping between repository page XML and [`PageDocument`].
//!
//! ```text
//! <page id=".." path=".." version="work">
//!   <head>
//!     <template>..</template>
//!     <metadata><title language="de">..</title><subject>..</subject></metadata>
//!     <created><user id=".." realm="..">Name</user><date>..</date></created>
//!     <modified>..</modified>
//!     <locked><user id="..">Name</user></locked>
//!   </head>
//!   <body>
//!     <composer id="main">
//!       <pagelet module="text" id="title">
//!         <created>..</created>
//!         <locale language="de" original="true">
//!           <modified>..</modified>
//!           <text id="title">Hallo</text>
//!         </locale>
//!         <properties><property id="level">2</property></properties>
//!       </pagelet>
//!     </composer>
//!   </body>
//! </page>
//! ```
//!
//! Repeated `<text>`/`<property>` elements with the same id form one
//! multi-valued entry, in document order. Sections this layer does not
//! interpret are kept as raw elements and written back unchanged.

use crate::user::{format_date, parse_date};
use crate::xml::{self, Element};
use crate::{
    CommonError, CommonResult, Composer, LocaleSet, LocaleVariant, Lock, Metadata, PageDocument,
    Pagelet, ResourceVersion, Stamp, User, ValueMap,
};

/// Decode the first `<page>` found in `xml`, `None` when there is none
pub fn decode_page(xml: &str) -> CommonResult<Option<PageDocument>> {
    let root = xml::parse(xml)?;
    root.find("page").map(page_from_element).transpose()
}

/// Decode every page of a listing (search results, referrers)
pub fn decode_pages(xml: &str) -> CommonResult<Vec<PageDocument>> {
    let root = xml::parse(xml)?;
    let mut found = Vec::new();
    root.find_all("page", &mut found);
    found.into_iter().map(page_from_element).collect()
}

/// Encode a page for a whole-document write
pub fn encode_page(page: &PageDocument) -> CommonResult<String> {
    xml::write(&page_to_element(page))
}

pub fn page_from_element(element: &Element) -> CommonResult<PageDocument> {
    let id = required_attr(element, "id")?;
    let version = match element.attr("version") {
        Some(v) => v.parse()?,
        None => ResourceVersion::Live,
    };

    let mut page = PageDocument::new(id, version);
    page.path = element.attr("path").map(str::to_string);

    if let Some(head) = element.child("head") {
        for section in head.elements() {
            match section.name.as_str() {
                "template" => page.template = Some(section.text()),
                "metadata" => page.metadata = metadata_from_element(section),
                "created" => page.created = stamp_from_element(section)?,
                "modified" => page.modified = stamp_from_element(section)?,
                "locked" => page.lock = lock_from_element(section)?,
                _ => page.head_extras.push(section.clone()),
            }
        }
    }

    if let Some(body) = element.child("body") {
        for composer in body.children_named("composer") {
            page.composers.push(composer_from_element(composer)?);
        }
    }

    Ok(page)
}

pub fn page_to_element(page: &PageDocument) -> Element {
    let mut root = Element::new("page").with_attr("id", &page.id);
    if let Some(path) = &page.path {
        root.set_attr("path", path);
    }
    root.set_attr("version", page.version.to_string());

    let mut head = Element::new("head");
    if let Some(template) = &page.template {
        head.push(Element::new("template").with_text(template));
    }
    for extra in &page.head_extras {
        head.push(extra.clone());
    }
    head.push(metadata_to_element(&page.metadata));
    if let Some(created) = &page.created {
        head.push(stamp_to_element("created", created));
    }
    if let Some(modified) = &page.modified {
        head.push(stamp_to_element("modified", modified));
    }
    if let Some(lock) = &page.lock {
        let mut locked = Element::new("locked").with_child(user_to_element(&lock.user));
        if let Some(since) = &lock.since {
            locked.push(Element::new("date").with_text(format_date(since)));
        }
        head.push(locked);
    }
    root.push(head);

    let mut body = Element::new("body");
    for composer in &page.composers {
        body.push(composer_to_element(composer));
    }
    root.push(body);
    root
}

fn composer_from_element(element: &Element) -> CommonResult<Composer> {
    let mut composer = Composer::new(required_attr(element, "id")?);
    for pagelet in element.children_named("pagelet") {
        composer.pagelets.push(pagelet_from_element(pagelet)?);
    }
    Ok(composer)
}

fn composer_to_element(composer: &Composer) -> Element {
    let mut element = Element::new("composer").with_attr("id", &composer.id);
    for pagelet in &composer.pagelets {
        element.push(pagelet_to_element(pagelet));
    }
    element
}

fn pagelet_from_element(element: &Element) -> CommonResult<Pagelet> {
    let mut pagelet = Pagelet::new(
        required_attr(element, "module")?,
        required_attr(element, "id")?,
    );
    let mut variants = Vec::new();

    for section in element.elements() {
        match section.name.as_str() {
            "created" => pagelet.created = stamp_from_element(section)?,
            "locale" => variants.push(locale_from_element(section)?),
            "properties" => {
                pagelet.properties = values_from_elements(section.children_named("property"))?
            }
            _ => pagelet.extras.push(section.clone()),
        }
    }

    pagelet.locale = variants.into_iter().collect::<LocaleSet>();
    Ok(pagelet)
}

fn pagelet_to_element(pagelet: &Pagelet) -> Element {
    let mut element = Element::new("pagelet")
        .with_attr("module", &pagelet.module)
        .with_attr("id", &pagelet.id);

    for extra in &pagelet.extras {
        element.push(extra.clone());
    }
    if let Some(created) = &pagelet.created {
        element.push(stamp_to_element("created", created));
    }

    for variant in &pagelet.locale {
        let mut locale = Element::new("locale").with_attr("language", &variant.language);
        if variant.original {
            locale.set_attr("original", "true");
        }
        if let Some(modified) = &variant.modified {
            locale.push(stamp_to_element("modified", modified));
        }
        push_values(&mut locale, "text", &variant.text);
        element.push(locale);
    }

    let mut properties = Element::new("properties");
    push_values(&mut properties, "property", &pagelet.properties);
    element.push(properties);
    element
}

fn locale_from_element(element: &Element) -> CommonResult<LocaleVariant> {
    let mut variant = LocaleVariant::new(required_attr(element, "language")?);
    variant.original = element.attr("original") == Some("true");
    if let Some(modified) = element.child("modified") {
        variant.modified = stamp_from_element(modified)?;
    }
    variant.text = values_from_elements(element.children_named("text"))?;
    Ok(variant)
}

fn values_from_elements<'a>(
    elements: impl Iterator<Item = &'a Element>,
) -> CommonResult<ValueMap> {
    let mut values = ValueMap::new();
    for element in elements {
        let entry = values.entry(required_attr(element, "id")?).or_default();
        // A childless element marks a key with no values
        if !element.children.is_empty() {
            entry.push(element.text());
        }
    }
    Ok(values)
}

fn push_values(parent: &mut Element, name: &str, values: &ValueMap) {
    for (key, entries) in values {
        if entries.is_empty() {
            parent.push(Element::new(name).with_attr("id", key));
        }
        for value in entries {
            parent.push(Element::new(name).with_attr("id", key).with_text(value));
        }
    }
}

fn metadata_from_element(element: &Element) -> Metadata {
    let mut metadata = Metadata::default();
    for entry in element.elements() {
        match (entry.name.as_str(), entry.attr("language")) {
            ("title", Some(language)) => {
                metadata.title.insert(language.to_string(), entry.text());
            }
            ("description", Some(language)) => {
                metadata.description.insert(language.to_string(), entry.text());
            }
            ("subject", _) => metadata.subjects.push(entry.text()),
            _ => metadata.extras.push(entry.clone()),
        }
    }
    metadata
}

fn metadata_to_element(metadata: &Metadata) -> Element {
    let mut element = Element::new("metadata");
    for (language, title) in &metadata.title {
        element.push(
            Element::new("title")
                .with_attr("language", language)
                .with_text(title),
        );
    }
    for (language, description) in &metadata.description {
        element.push(
            Element::new("description")
                .with_attr("language", language)
                .with_text(description),
        );
    }
    for subject in &metadata.subjects {
        element.push(Element::new("subject").with_text(subject));
    }
    for extra in &metadata.extras {
        element.push(extra.clone());
    }
    element
}

fn stamp_from_element(element: &Element) -> CommonResult<Option<Stamp>> {
    let (Some(user), Some(date)) = (element.child("user"), element.child("date")) else {
        return Ok(None);
    };
    Ok(Some(Stamp::new(
        user_from_element(user)?,
        parse_date(&date.text())?,
    )))
}

fn stamp_to_element(name: &str, stamp: &Stamp) -> Element {
    Element::new(name)
        .with_child(user_to_element(&stamp.user))
        .with_child(Element::new("date").with_text(format_date(&stamp.date)))
}

fn lock_from_element(element: &Element) -> CommonResult<Option<Lock>> {
    let Some(user) = element.child("user") else {
        return Ok(None);
    };
    let since = element
        .child("date")
        .map(|d| parse_date(&d.text()))
        .transpose()?;
    Ok(Some(Lock {
        user: user_from_element(user)?,
        since,
    }))
}

fn user_from_element(element: &Element) -> CommonResult<User> {
    let mut user = User::new(required_attr(element, "id")?);
    user.realm = element.attr("realm").map(str::to_string);
    let name = element.text();
    if !name.is_empty() {
        user.name = Some(name);
    }
    Ok(user)
}

fn user_to_element(user: &User) -> Element {
    let mut element = Element::new("user").with_attr("id", &user.id);
    if let Some(realm) = &user.realm {
        element.set_attr("realm", realm);
    }
    if let Some(name) = &user.name {
        element = element.with_text(name);
    }
    element
}

fn required_attr(element: &Element, name: &str) -> CommonResult<String> {
    element.attr(name).map(str::to_string).ok_or_else(|| {
        CommonError::Malformed(format!("<{}> is missing attribute '{}'", element.name, name))
    })
}
