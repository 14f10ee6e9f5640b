use pretty_assertions::assert_eq;
use relay_engine::{parse_selector, NodeChange, PageError, VisualPage, TAG_ATTRIBUTE};
use tokio::sync::mpsc::error::TryRecvError;

const FEED: &str = r#"<html><head><title>Studio</title></head><body>
<div id="feed">
  <div class="job"><p>A Red Dragon</p><span class="pct">10% Complete</span></div>
  <div class="job other"><p>a blue whale</p></div>
</div>
<div id="sidebar"><script>var hidden = "a red dragon";</script></div>
</body></html>"#;

fn find(page: &VisualPage, selector: &str) -> relay_engine::NodeHandle {
    page.select(selector).unwrap().unwrap()
}

#[test]
fn text_of_concatenates_rendered_text_only() {
    let page = VisualPage::from_html(FEED);
    let job = find(&page, ".job");
    assert_eq!(page.text_of(job).as_deref(), Some("A Red Dragon10% Complete"));

    let sidebar = find(&page, "#sidebar");
    assert_eq!(page.text_of(sidebar).as_deref(), Some(""));
}

#[test]
fn find_containing_ignores_case_and_returns_innermost_element() {
    let page = VisualPage::from_html(FEED);
    let feed = find(&page, "#feed");
    let title = find(&page, ".job > p");

    let found = page.with_document(|doc| doc.find_containing(feed, "a red DRAGON", TAG_ATTRIBUTE, "p1"));
    assert_eq!(found, Some(title));

    let missing = page.with_document(|doc| doc.find_containing(feed, "a green frog", TAG_ATTRIBUTE, "p1"));
    assert_eq!(missing, None);

    let empty = page.with_document(|doc| doc.find_containing(feed, "   ", TAG_ATTRIBUTE, "p1"));
    assert_eq!(empty, None);
}

#[test]
fn find_containing_spans_inline_children() {
    let page = VisualPage::from_html(
        r#"<body><main><div class="job">a red <b>fox</b> <span>45% Complete</span></div></main></body>"#,
    );
    let body = find(&page, "body");
    let job = find(&page, ".job");

    let found = page.with_document(|doc| doc.find_containing(body, "a red fox", TAG_ATTRIBUTE, "p1"));
    assert_eq!(found, Some(job));
}

#[test]
fn find_containing_skips_nodes_claimed_by_another_request() {
    let page = VisualPage::from_html(
        r#"<body><main><div class="job" data-prompt-id="p1">a cute cat 40% Complete</div></main></body>"#,
    );
    let body = find(&page, "body");
    let claimed = find(&page, "[data-prompt-id=p1]");

    let for_owner = page.with_document(|doc| doc.find_containing(body, "a cute cat", TAG_ATTRIBUTE, "p1"));
    assert_eq!(for_owner, Some(claimed));

    // The shared <main> wrapper is not innermost, so nothing is left for p2.
    let for_other = page.with_document(|doc| doc.find_containing(body, "a cute cat", TAG_ATTRIBUTE, "p2"));
    assert_eq!(for_other, None);

    let main = find(&page, "main");
    page.append_html(main, r#"<div class="job">a cute cat 5% Complete</div>"#)
        .unwrap();
    let unclaimed = find(&page, ".job:not([data-prompt-id])");
    let for_other = page.with_document(|doc| doc.find_containing(body, "a cute cat", TAG_ATTRIBUTE, "p2"));
    assert_eq!(for_other, Some(unclaimed));
}

#[test]
fn change_inside_watched_subtree_notifies() {
    let page = VisualPage::from_html(FEED);
    let job = find(&page, ".job");
    let pct = find(&page, ".pct");
    let mut changes = page.watch(job).unwrap();

    page.set_text(pct, "55% Complete").unwrap();

    assert_eq!(changes.try_recv(), Ok(NodeChange::Changed));
    assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(page.text_of(job).as_deref(), Some("A Red Dragon55% Complete"));
}

#[test]
fn change_outside_watched_subtree_is_silent() {
    let page = VisualPage::from_html(FEED);
    let job = find(&page, ".job");
    let other = find(&page, ".other");
    let mut changes = page.watch(job).unwrap();

    page.append_html(other, "<em>queued</em>").unwrap();

    assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn attribute_writes_do_not_notify() {
    let page = VisualPage::from_html(FEED);
    let job = find(&page, ".job");
    let mut changes = page.watch(job).unwrap();

    page.set_attr(job, "data-prompt-id", "p1").unwrap();

    assert_eq!(page.attr(job, "data-prompt-id").as_deref(), Some("p1"));
    assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn removing_an_ancestor_detaches_exactly_once() {
    let page = VisualPage::from_html(FEED);
    let feed = find(&page, "#feed");
    let pct = find(&page, ".pct");
    let mut changes = page.watch(pct).unwrap();

    page.remove(feed).unwrap();

    assert_eq!(changes.try_recv(), Ok(NodeChange::Detached));
    assert_eq!(changes.try_recv(), Err(TryRecvError::Disconnected));
    assert!(!page.is_attached(pct));
    assert_eq!(page.text_of(pct), None);
    assert_eq!(page.set_text(pct, "x"), Err(PageError::Detached));
}

#[test]
fn replacing_inner_html_detaches_old_children() {
    let page = VisualPage::from_html(FEED);
    let feed = find(&page, "#feed");
    let job = find(&page, ".job");
    let mut feed_changes = page.watch(feed).unwrap();
    let mut job_changes = page.watch(job).unwrap();

    let added = page
        .set_inner_html(feed, r#"<div class="job">a red dragon 80% Complete</div>"#)
        .unwrap();

    assert_eq!(added.len(), 1);
    assert_eq!(feed_changes.try_recv(), Ok(NodeChange::Changed));
    assert_eq!(job_changes.try_recv(), Ok(NodeChange::Detached));
    assert_eq!(
        page.text_of(added[0]).as_deref(),
        Some("a red dragon 80% Complete")
    );
}

#[test]
fn replacing_the_document_stales_every_handle() {
    let page = VisualPage::from_html(FEED);
    let job = find(&page, ".job");
    let mut changes = page.watch(job).unwrap();

    page.replace_document(FEED);

    assert_eq!(changes.try_recv(), Ok(NodeChange::Detached));
    assert_eq!(changes.try_recv(), Err(TryRecvError::Disconnected));
    assert_eq!(page.text_of(job), None);
    assert_eq!(page.set_attr(job, "data-prompt-id", "p1"), Err(PageError::StaleHandle));

    let fresh = find(&page, ".job");
    assert_ne!(fresh, job);
    assert_eq!(page.text_of(fresh).as_deref(), Some("A Red Dragon10% Complete"));
}

#[test]
fn query_supports_attribute_selector() {
    let page = VisualPage::from_html(r#"<body><div data-prompt-id="p7">tagged</div></body>"#);
    let selector = parse_selector("[data-prompt-id=p7]").unwrap();
    let node = page.query(&selector).unwrap();
    assert_eq!(page.text_of(node).as_deref(), Some("tagged"));
}

#[test]
fn select_understands_compound_and_combinator_selectors() {
    let page = VisualPage::from_html(
        r#"<body><main><div class="jobs">first</div><section><div>nested</div></section></main></body>"#,
    );

    let jobs = find(&page, "div.jobs");
    assert_eq!(page.text_of(jobs).as_deref(), Some("first"));
    assert_eq!(find(&page, "main > div"), jobs);
    let nested = find(&page, "main section > div");
    assert_eq!(page.text_of(nested).as_deref(), Some("nested"));

    assert_eq!(page.select("div.missing"), Ok(None));
    assert!(matches!(
        page.select("div["),
        Err(PageError::InvalidSelector { .. })
    ));
}

#[test]
fn select_sees_nodes_added_after_parsing() {
    let page = VisualPage::from_html(FEED);
    let feed = find(&page, "#feed");
    page.append_html(feed, r#"<div class="job late">a grey <i>owl</i> &amp; friends</div>"#)
        .unwrap();

    let late = find(&page, "#feed > .job.late");
    assert_eq!(page.text_of(late).as_deref(), Some("a grey owl & friends"));
}

const SNAPSHOT: &str = r#"<html><body><div id="feed"><div class="job">a red fox <span class="pct">45% Complete</span></div></div></body></html>"#;

#[test]
fn patching_keeps_tags_handles_and_watchers() {
    let page = VisualPage::from_html(SNAPSHOT);
    let job = find(&page, ".job");
    page.set_attr(job, TAG_ATTRIBUTE, "p1").unwrap();
    let mut changes = page.watch(job).unwrap();

    let changed = page.patch_document(&SNAPSHOT.replace("45%", "50%"), &[TAG_ATTRIBUTE]);

    assert!(changed);
    assert!(page.is_attached(job));
    assert_eq!(page.attr(job, TAG_ATTRIBUTE).as_deref(), Some("p1"));
    assert_eq!(page.text_of(job).as_deref(), Some("a red fox 50% Complete"));
    assert_eq!(changes.try_recv(), Ok(NodeChange::Changed));
    assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(find(&page, "[data-prompt-id=p1]"), job);
}

#[test]
fn patching_an_identical_snapshot_changes_nothing() {
    let page = VisualPage::from_html(SNAPSHOT);
    let job = find(&page, ".job");
    let mut changes = page.watch(job).unwrap();

    assert!(!page.patch_document(SNAPSHOT, &[TAG_ATTRIBUTE]));
    assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn patching_follows_a_node_when_a_sibling_is_inserted_before_it() {
    let page = VisualPage::from_html(SNAPSHOT);
    let job = find(&page, ".job");
    page.set_attr(job, TAG_ATTRIBUTE, "p1").unwrap();
    let mut changes = page.watch(job).unwrap();

    let newest_first = SNAPSHOT.replace(
        r#"<div id="feed">"#,
        r#"<div id="feed"><div class="job">a grey owl <span class="pct">0% Complete</span></div>"#,
    );
    assert!(page.patch_document(&newest_first, &[TAG_ATTRIBUTE]));

    assert!(page.is_attached(job));
    assert_eq!(page.text_of(job).as_deref(), Some("a red fox 45% Complete"));
    let first = find(&page, ".job");
    assert_ne!(first, job);
    assert_eq!(page.text_of(first).as_deref(), Some("a grey owl 0% Complete"));
    assert_eq!(page.attr(first, TAG_ATTRIBUTE), None);
    assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn patching_detaches_nodes_missing_from_the_new_snapshot() {
    let page = VisualPage::from_html(SNAPSHOT);
    let feed = find(&page, "#feed");
    let job = find(&page, ".job");
    let mut feed_changes = page.watch(feed).unwrap();
    let mut job_changes = page.watch(job).unwrap();

    assert!(page.patch_document(
        r#"<html><body><div id="feed"></div></body></html>"#,
        &[TAG_ATTRIBUTE]
    ));

    assert!(page.is_attached(feed));
    assert!(!page.is_attached(job));
    assert_eq!(feed_changes.try_recv(), Ok(NodeChange::Changed));
    assert_eq!(job_changes.try_recv(), Ok(NodeChange::Detached));
}
