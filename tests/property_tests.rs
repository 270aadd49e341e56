//! Property-based tests for the inventory service.
//!
//! Random sequences of stock and sale operations are replayed against a fresh
//! database and checked against a simple in-memory model.

mod common;

use std::collections::BTreeMap;

use axum::http::Method;
use inventory_sales_api::services::validation::ItemName;
use proptest::prelude::*;
use serde_json::json;

use common::{response_json, TestApp};

#[derive(Debug, Clone)]
enum Op {
    Add { name: String, amount: i64 },
    Sell { name: String, amount: i64, price: Option<u32> },
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["APPLE", "apple", "PEAR", "Kiwi"].prop_map(|s| s.to_string())
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (name_strategy(), 0i64..20).prop_map(|(name, amount)| Op::Add { name, amount }),
        (name_strategy(), 0i64..8, proptest::option::of(1u32..50))
            .prop_map(|(name, amount, price)| Op::Sell { name, amount, price }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn item_names_follow_the_letter_rule(raw in "\\PC{0,12}") {
        let expected = !raw.is_empty()
            && raw.chars().count() <= 8
            && raw.chars().all(|c| c.is_ascii_alphabetic());
        prop_assert_eq!(ItemName::parse(&raw).is_ok(), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn api_matches_in_memory_model(ops in proptest::collection::vec(op_strategy(), 1..25)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let app = TestApp::new().await;
            let mut stock: BTreeMap<String, i64> = BTreeMap::new();
            let mut revenue: BTreeMap<String, i64> = BTreeMap::new();

            for op in &ops {
                match op {
                    Op::Add { name, amount } => {
                        app.add_stock(name, *amount).await;
                        *stock.entry(name.clone()).or_default() += amount;
                    }
                    Op::Sell { name, amount, price } => {
                        let mut payload = json!({"name": name, "amount": amount});
                        if let Some(price) = price {
                            payload["price"] = json!(price);
                        }
                        let response = app.request(Method::POST, "/v1/sales", Some(payload)).await;

                        let on_hand = stock.get(name).copied();
                        let expected = match (on_hand, price) {
                            (None, Some(_)) => 404,
                            (None, None) => 400,
                            (Some(have), _) if have < *amount => 400,
                            (Some(_), _) => 201,
                        };
                        assert_eq!(response.status().as_u16(), expected, "{:?}", op);

                        if expected == 201 {
                            *stock.get_mut(name).unwrap() -= amount;
                            if let Some(price) = price {
                                *revenue.entry(name.clone()).or_default() += i64::from(*price) * amount;
                            }
                        }
                    }
                }
            }

            let response = app.request(Method::GET, "/v1/stocks", None).await;
            assert_eq!(response_json(response).await, json!(stock));

            let response = app.request(Method::GET, "/v1/sales", None).await;
            let total: i64 = revenue.values().sum();
            assert_eq!(response_json(response).await, json!({"sales": total}));

            for (name, expected) in &revenue {
                let response = app.request(Method::GET, &format!("/v1/sales/{}", name), None).await;
                assert_eq!(response_json(response).await[name], json!(expected));
            }
        });
    }
}
