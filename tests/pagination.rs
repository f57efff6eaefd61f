//! Pagination behavior of the list walker against an in-memory server

mod common;

use common::{contributor_page, MockTransport};
use futures::StreamExt;
use jazz_client::fetch::{ListWalker, PageFormat};
use jazz_client::Error;
use serde_json::json;
use std::sync::Arc;

fn xml_walker(transport: Arc<MockTransport>) -> ListWalker {
    ListWalker::new(
        transport,
        PageFormat::Xml {
            list_tag: "contributor".to_string(),
        },
    )
}

async fn collect(walker: &ListWalker, url: &str) -> Vec<Result<String, Error>> {
    walker.walk(url.to_string()).collect().await
}

#[tokio::test]
async fn test_follows_next_links() {
    let transport = Arc::new(MockTransport::new(|url| match url {
        "page1" => (200, contributor_page(&["_a", "_b"], Some("page2"))),
        "page2" => (200, contributor_page(&["_c", "_d"], Some("page3"))),
        "page3" => (200, contributor_page(&["_e"], None)),
        _ => (404, String::new()),
    }));
    let walker = xml_walker(transport.clone()).with_page_size(2);

    let ids: Vec<String> = collect(&walker, "page1")
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(ids, ["_a", "_b", "_c", "_d", "_e"]);
    assert_eq!(transport.gets(), 3);
}

#[tokio::test]
async fn test_short_page_ends_walk() {
    let transport = Arc::new(MockTransport::new(|url| match url {
        "page1" => (200, contributor_page(&["_a"], Some("page2"))),
        _ => panic!("unexpected request for {url}"),
    }));
    let walker = xml_walker(transport.clone()).with_page_size(100);

    let ids = collect(&walker, "page1").await;
    assert_eq!(ids.len(), 1);
    assert_eq!(transport.gets(), 1);
}

#[tokio::test]
async fn test_next_link_to_same_page_ends_walk() {
    let transport = Arc::new(MockTransport::new(|_| {
        (200, contributor_page(&["_a", "_b"], Some("page1")))
    }));
    let walker = xml_walker(transport.clone()).with_page_size(2);

    let ids = collect(&walker, "page1").await;
    assert_eq!(ids.len(), 2);
    assert_eq!(transport.gets(), 1);
}

#[tokio::test]
async fn test_failing_page_keeps_earlier_ids() {
    let transport = Arc::new(MockTransport::new(|url| match url {
        "page1" => (200, contributor_page(&["_a", "_b"], Some("page2"))),
        _ => (
            500,
            "<error><message>CRJZS5663E Internal error</message></error>".to_string(),
        ),
    }));
    let walker = xml_walker(transport).with_page_size(2);

    let results = collect(&walker, "page1").await;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap(), "_a");
    assert_eq!(results[1].as_ref().unwrap(), "_b");
    match &results[2] {
        Err(Error::Status { status, message }) => {
            assert_eq!(*status, 500);
            assert!(message.contains("CRJZS5663E"));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn test_walk_is_lazy_and_restartable() {
    let transport = Arc::new(MockTransport::new(|_| {
        (200, contributor_page(&["_a"], None))
    }));
    let walker = xml_walker(transport.clone());

    let stream = walker.walk("page1".to_string());
    assert_eq!(transport.gets(), 0);
    drop(stream);

    assert_eq!(collect(&walker, "page1").await.len(), 1);
    assert_eq!(collect(&walker, "page1").await.len(), 1);
    assert_eq!(transport.gets(), 2);
}

#[tokio::test]
async fn test_feed_pages() {
    let transport = Arc::new(MockTransport::new(|url| match url {
        "feed" => (
            200,
            json!({"feed": {
                "entry": [{"id": "e1"}, {"id": "e2"}],
                "link": [{"rel": "next", "href": "feed2"}]
            }})
            .to_string(),
        ),
        "feed2" => (
            200,
            json!({"feed": {"entry": {"id": "e3"}}}).to_string(),
        ),
        _ => (404, String::new()),
    }));
    let walker = ListWalker::new(transport, PageFormat::Feed);

    let ids: Vec<String> = collect(&walker, "feed")
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(ids, ["e1", "e2", "e3"]);
}
