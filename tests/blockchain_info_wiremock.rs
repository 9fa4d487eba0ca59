use anyhow::Result;
use incomebook::fetch::fetchers::BlockchainInfoFetcher;
use incomebook::fetch::{FetchError, TransferFetcher};
use incomebook::models::AddressGroup;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(n_tx: u64, start: u64, count: u64, result: impl Fn(u64) -> i64) -> Value {
    let txs: Vec<Value> = (start..start + count)
        .map(|i| {
            json!({
                "hash": format!("tx{i}"),
                "time": 1_600_000_000 + i as i64,
                "result": result(i),
                "out": [{ "addr": "1Bob", "value": 1 }]
            })
        })
        .collect();
    json!({
        "addresses": [],
        "wallet": { "n_tx": n_tx },
        "txs": txs
    })
}

fn group() -> AddressGroup {
    AddressGroup::new("bitcoin", vec!["1Alice".to_string(), "1Bob".to_string()])
}

#[tokio::test]
async fn offset_pagination_requests_until_total_is_reached() -> Result<()> {
    let server = MockServer::start().await;

    for (offset, count) in [(0u64, 100u64), (100, 100), (200, 50)] {
        Mock::given(method("GET"))
            .and(path("/multiaddr"))
            .and(query_param("active", "1Alice|1Bob"))
            .and(query_param("n", "100"))
            .and(query_param("offset", offset.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(250, offset, count, |_| 1000)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let fetcher = BlockchainInfoFetcher::new("bitcoin", reqwest::Client::new())
        .with_base_url(server.uri())
        .with_page_size(100);
    let transfers = fetcher.fetch_inbound(&group()).await?;

    assert_eq!(transfers.len(), 250);
    assert_eq!(transfers[0].hash, "tx0");
    assert_eq!(transfers[249].hash, "tx249");
    assert!(transfers.iter().all(|t| t.address == "1Bob" && t.amount == 1000));

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);

    Ok(())
}

#[tokio::test]
async fn offset_pagination_counts_filtered_entries_towards_the_total() -> Result<()> {
    let server = MockServer::start().await;

    // Odd transactions are outgoing; they still advance the offset.
    for (offset, count) in [(0u64, 2u64), (2, 2)] {
        Mock::given(method("GET"))
            .and(path("/multiaddr"))
            .and(query_param("offset", offset.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(4, offset, count, |i| {
                if i % 2 == 0 {
                    500
                } else {
                    -500
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let fetcher = BlockchainInfoFetcher::new("bitcoin", reqwest::Client::new())
        .with_base_url(server.uri())
        .with_page_size(2);
    let transfers = fetcher.fetch_inbound(&group()).await?;

    let hashes: Vec<_> = transfers.iter().map(|t| t.hash.as_str()).collect();
    assert_eq!(hashes, vec!["tx0", "tx2"]);

    Ok(())
}

#[tokio::test]
async fn address_without_transactions_is_empty() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/multiaddr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 0, 0, |_| 0)))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher =
        BlockchainInfoFetcher::new("bitcoin", reqwest::Client::new()).with_base_url(server.uri());
    let transfers = fetcher.fetch_inbound(&group()).await?;
    assert!(transfers.is_empty());

    Ok(())
}

#[tokio::test]
async fn server_error_is_a_fetch_failure_naming_the_group() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/multiaddr"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Maximum concurrent requests reached"))
        .mount(&server)
        .await;

    let fetcher =
        BlockchainInfoFetcher::new("bitcoin", reqwest::Client::new()).with_base_url(server.uri());
    let err = fetcher.fetch_inbound(&group()).await.unwrap_err();

    match &err {
        FetchError::Status {
            network,
            address,
            status,
            ..
        } => {
            assert_eq!(network, "bitcoin");
            assert_eq!(address, "1Alice|1Bob");
            assert_eq!(*status, 500);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn malformed_body_is_a_decode_failure() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/multiaddr"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>oops</html>", "text/html"))
        .mount(&server)
        .await;

    let fetcher =
        BlockchainInfoFetcher::new("bitcoin", reqwest::Client::new()).with_base_url(server.uri());
    let err = fetcher.fetch_inbound(&group()).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));

    Ok(())
}
