//! End-to-end runs of the repricer over fake collaborators.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use std::sync::Arc;

use repricer::catalog::shop_api::products_from_values;
use repricer::catalog::{CatalogClient, Credentials};
use repricer::config::AppConfig;
use repricer::engine::runner::{ProductOutcome, Repricer};
use repricer::types::{Product, Rationale, UpdateOutcome};

use crate::fakes::*;

const CONFIG: &str = r#"
[general]
shop_name = "My Shop"
price_update_enabled = true
request_delay_secs = 0

[pricing]
vat_rate = 0.2
minimum_discount = 0.05
under_best_price_amount = 5

[api]
base_url = "https://shop.example.com/api"
login_path = "/login"
product_list_path = "/products"
product_update_path = "/product/update"

[market]
search_url = "https://compare.example.com"
search_param = "q"
challenge_title = "Are you a robot?"
user_agents = ["IntegrationTest/1.0"]

[credentials]
username_env = "REPRICER_API_USERNAME"
password_env = "REPRICER_API_PASSWORD"
"#;

fn config(updates_enabled: bool) -> AppConfig {
    let mut cfg = AppConfig::from_toml(CONFIG).unwrap();
    cfg.general.price_update_enabled = updates_enabled;
    cfg
}

fn product(id: &str, name: &str, list_price: Decimal) -> Product {
    Product {
        product_id: id.to_string(),
        name: name.to_string(),
        list_price,
        promo_price: None,
        reference_price: Some(dec!(100)),
        price_floor_override: None,
    }
}

async fn session(catalog: &InMemoryCatalog) -> (repricer::catalog::SessionToken, Vec<Product>) {
    let credentials = Credentials {
        username: "merchant".into(),
        password: SecretString::new("hunter2".into()),
    };
    let token = catalog.login(&credentials).await.unwrap();
    let products = catalog.list_products(&token).await.unwrap();
    (token, products)
}

#[tokio::test]
async fn test_undercuts_cheaper_competitor() {
    let site = Arc::new(
        FakeSite::default()
            .with_page(search_url("Acme Kettle"), search_page("Acme Kettle", "acme-kettle"))
            .with_page(
                detail_url("acme-kettle"),
                detail_page(
                    "Acme Kettle",
                    &[("160,00 €", "My Shop"), ("150,00 €", "Rival"), ("155,00 €", "Other")],
                ),
            ),
    );
    let catalog = Arc::new(InMemoryCatalog::new(vec![product("1", "Acme Kettle", dec!(160))]));
    let (token, products) = session(&catalog).await;

    let repricer = Repricer::from_config(&config(true), site.clone(), catalog.clone(), token).unwrap();
    let report = repricer.run(&products).await;

    assert_eq!(report.evaluated, 1);
    assert_eq!(report.applied, 1);
    assert_eq!(catalog.updates(), vec![("1".to_string(), dec!(145))]);
    // The exit redirect in the results list is never followed.
    assert!(site.requests().iter().all(|url| !url.contains("/exit")));
}

#[tokio::test]
async fn test_challenge_stops_the_batch() {
    let names = ["Kettle A", "Kettle B", "Kettle C", "Kettle D", "Kettle E"];
    let site = Arc::new(
        FakeSite::default()
            .with_page(search_url(names[0]), search_page(names[0], "kettle-a"))
            .with_page(
                detail_url("kettle-a"),
                detail_page(names[0], &[("150,00 €", "Rival"), ("160,00 €", "My Shop")]),
            )
            .with_page(search_url(names[1]), challenge_page()),
    );
    let products: Vec<Product> = names
        .iter()
        .enumerate()
        .map(|(i, name)| product(&(i + 1).to_string(), name, dec!(160)))
        .collect();
    let catalog = Arc::new(InMemoryCatalog::new(products));
    let (token, products) = session(&catalog).await;

    let repricer = Repricer::from_config(&config(true), site.clone(), catalog.clone(), token).unwrap();
    let report = repricer.run(&products).await;

    assert!(report.aborted_by_challenge);
    assert_eq!(report.evaluated, 1);
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 4);
    assert_eq!(catalog.updates().len(), 1);

    let requests = site.requests();
    assert_eq!(requests.len(), 3);
    for name in &names[2..] {
        assert!(!requests.contains(&search_url(name)), "{name} was searched");
    }
}

#[tokio::test]
async fn test_disabled_updates_touch_nothing() {
    let site = Arc::new(
        FakeSite::default()
            .with_page(search_url("Acme Kettle"), search_page("Acme Kettle", "acme-kettle"))
            .with_page(
                detail_url("acme-kettle"),
                detail_page("Acme Kettle", &[("150,00 €", "Rival"), ("160,00 €", "My Shop")]),
            ),
    );
    let catalog = Arc::new(InMemoryCatalog::new(vec![product("1", "Acme Kettle", dec!(160))]));
    let (token, products) = session(&catalog).await;

    let repricer = Repricer::from_config(&config(false), site, catalog.clone(), token).unwrap();
    let outcome = repricer.process_product(&products[0]).await.unwrap();

    match outcome {
        ProductOutcome::Updated { decision, outcome } => {
            assert_eq!(decision.proposed_price, Some(dec!(145.00)));
            assert_eq!(outcome, UpdateOutcome::Disabled);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(catalog.updates().is_empty());
}

#[tokio::test]
async fn test_failures_are_isolated_per_product() {
    let site = Arc::new(
        FakeSite::default()
            // "Missing" has no search page at all: transport error.
            .with_page(
                search_url("Unlisted"),
                "<html><head><title>No results</title></head><body></body></html>",
            )
            .with_page(search_url("Garbled"), search_page("Garbled", "garbled"))
            .with_page(
                detail_url("garbled"),
                detail_page("Garbled", &[("call for price", "Rival")]),
            )
            .with_page(search_url("Below Floor"), search_page("Below Floor", "below-floor"))
            .with_page(
                detail_url("below-floor"),
                detail_page("Below Floor", &[("100,00 €", "Rival"), ("160,00 €", "My Shop")]),
            )
            .with_page(search_url("Acme Kettle"), search_page("Acme Kettle", "acme-kettle"))
            .with_page(
                detail_url("acme-kettle"),
                detail_page("Acme Kettle", &[("150,00 €", "Rival"), ("160,00 €", "My Shop")]),
            ),
    );
    let catalog = Arc::new(
        InMemoryCatalog::new(vec![
            product("1", "Missing", dec!(160)),
            product("2", "Unlisted", dec!(160)),
            product("3", "Garbled", dec!(160)),
            product("4", "Below Floor", dec!(160)),
            product("5", "Acme Kettle", dec!(160)),
        ])
        .rejecting(),
    );
    let (token, products) = session(&catalog).await;

    let repricer = Repricer::from_config(&config(true), site, catalog.clone(), token).unwrap();
    let report = repricer.run(&products).await;

    assert_eq!(report.evaluated, 5);
    assert_eq!(report.errors, 1);
    assert_eq!(report.not_found, 1);
    assert_eq!(report.parse_failures, 1);
    assert_eq!(report.no_change, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(catalog.updates(), vec![("5".to_string(), dec!(145))]);
}

#[tokio::test]
async fn test_below_floor_is_never_proposed() {
    let site = Arc::new(
        FakeSite::default()
            .with_page(search_url("Acme Kettle"), search_page("Acme Kettle", "acme-kettle"))
            .with_page(
                detail_url("acme-kettle"),
                detail_page("Acme Kettle", &[("100,00 €", "Rival"), ("160,00 €", "My Shop")]),
            ),
    );
    let catalog = Arc::new(InMemoryCatalog::new(vec![product("1", "Acme Kettle", dec!(160))]));
    let (token, products) = session(&catalog).await;

    let repricer = Repricer::from_config(&config(true), site, catalog.clone(), token).unwrap();
    let outcome = repricer.process_product(&products[0]).await.unwrap();

    match outcome {
        ProductOutcome::NoChange(decision) => {
            assert_eq!(decision.proposed_price, None);
            assert_eq!(decision.min_accepted_price, dec!(126.00));
            assert_eq!(decision.rationale, Rationale::BelowFloor { candidate: dec!(95) });
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(catalog.updates().is_empty());
}

#[tokio::test]
async fn test_catalog_records_feed_the_pipeline() {
    let values = vec![
        serde_json::json!({ "name": "No Id", "price": "10.00" }),
        serde_json::json!({ "product_id": 7, "name": "Acme Kettle", "price": "160.00", "special": "0", "mrp_price": 100, "limit": "" }),
        serde_json::json!({ "product_id": 8, "name": "Broken", "price": "n/a" }),
        serde_json::json!({ "product_id": 9, "name": null, "price": "10.00" }),
    ];
    let products = products_from_values(values);
    assert_eq!(products.len(), 1);

    let site = Arc::new(
        FakeSite::default()
            .with_page(search_url("Acme Kettle"), search_page("Acme Kettle", "acme-kettle"))
            .with_page(
                detail_url("acme-kettle"),
                detail_page("Acme Kettle", &[("150,00 €", "Rival"), ("160,00 €", "My Shop")]),
            ),
    );
    let catalog = Arc::new(InMemoryCatalog::new(products));
    let (token, products) = session(&catalog).await;

    let repricer = Repricer::from_config(&config(true), site, catalog.clone(), token).unwrap();
    let report = repricer.run(&products).await;

    assert_eq!(report.applied, 1);
    assert_eq!(catalog.updates(), vec![("7".to_string(), dec!(145))]);
}
