//! Mock Shopify Admin API
//!
//! In-memory store for running stock-sync end to end without a real shop.
//!
//! Endpoints (under /admin/api/<version>/):
//! - GET  locations.json
//! - GET  variants.json?barcode=<barcode>
//! - GET  inventory_levels.json?inventory_item_ids=<id>&location_ids=<id>
//! - POST inventory_levels/set.json
//!
//! Usage:
//!   cargo run --bin mock_shopify -- --port 9900 --stock 111:5 --stock 222:0
//!
//! and point stock-sync at it with `[store] scheme = "http"`,
//! `host = "localhost:9900"`.

use bytes::Bytes;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(name = "mock_shopify")]
#[command(about = "Mock Shopify Admin API for local stock sync runs")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "9900")]
    port: u16,

    /// Location id reported by locations.json
    #[arg(long, default_value = "1001")]
    location_id: i64,

    /// Seed stock as BARCODE:AVAILABLE (repeatable)
    #[arg(long = "stock", value_parser = parse_stock)]
    stock: Vec<(String, i64)>,

    /// Answer every set.json with this status instead of 200
    #[arg(long)]
    reject_writes_with: Option<u16>,
}

fn parse_stock(raw: &str) -> Result<(String, i64), String> {
    let (barcode, available) =
        raw.split_once(':').ok_or_else(|| format!("expected BARCODE:AVAILABLE, got {raw:?}"))?;
    let available = available.parse::<i64>().map_err(|e| format!("bad available: {e}"))?;
    Ok((barcode.to_string(), available))
}

struct Item {
    variant_id: i64,
    inventory_item_id: i64,
    available: i64,
}

struct Store {
    location_id: i64,
    reject_writes_with: Option<u16>,
    /// barcode -> item
    items: Mutex<FxHashMap<String, Item>>,
}

#[derive(Deserialize)]
struct SetLevel {
    location_id: i64,
    inventory_item_id: i64,
    available: i64,
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

async fn handle(
    req: Request<hyper::body::Incoming>,
    store: Arc<Store>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or("").to_string();

    // Strip /admin/api/<version>/
    let Some((_, endpoint)) = path.strip_prefix("/admin/api/").and_then(|p| p.split_once('/'))
    else {
        return Ok(json_response(StatusCode::NOT_FOUND, json!({"errors": "Not Found"})));
    };

    if req.headers().get("x-shopify-access-token").is_none() {
        println!("[MOCK] {} {} -> 401 (no token)", method, path);
        return Ok(json_response(
            StatusCode::UNAUTHORIZED,
            json!({"errors": "[API] Invalid API key or access token"}),
        ));
    }

    let response = match (method.clone(), endpoint) {
        (Method::GET, "locations.json") => json_response(
            StatusCode::OK,
            json!({"locations": [{"id": store.location_id, "name": "Mock warehouse"}]}),
        ),
        (Method::GET, "variants.json") => {
            let barcode = query_param(&query, "barcode").unwrap_or("");
            let items = store.items.lock();
            let variants: Vec<_> = items
                .get(barcode)
                .map(|item| {
                    json!({
                        "id": item.variant_id,
                        "barcode": barcode,
                        "inventory_item_id": item.inventory_item_id,
                    })
                })
                .into_iter()
                .collect();
            json_response(StatusCode::OK, json!({ "variants": variants }))
        }
        (Method::GET, "inventory_levels.json") => {
            let item_id =
                query_param(&query, "inventory_item_ids").and_then(|v| v.parse::<i64>().ok());
            let items = store.items.lock();
            let levels: Vec<_> = items
                .values()
                .filter(|item| Some(item.inventory_item_id) == item_id)
                .map(|item| {
                    json!({
                        "inventory_item_id": item.inventory_item_id,
                        "location_id": store.location_id,
                        "available": item.available,
                    })
                })
                .collect();
            json_response(StatusCode::OK, json!({ "inventory_levels": levels }))
        }
        (Method::POST, "inventory_levels/set.json") => {
            let body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    eprintln!("[MOCK] Body read error: {}", e);
                    return Ok(json_response(
                        StatusCode::BAD_REQUEST,
                        json!({"errors": "bad body"}),
                    ));
                }
            };
            set_level(&store, &body)
        }
        _ => json_response(StatusCode::NOT_FOUND, json!({"errors": "Not Found"})),
    };

    println!("[MOCK] {} {} -> {}", method, path, response.status().as_u16());
    Ok(response)
}

fn set_level(store: &Store, body: &[u8]) -> Response<Full<Bytes>> {
    let Ok(request) = serde_json::from_slice::<SetLevel>(body) else {
        return json_response(StatusCode::BAD_REQUEST, json!({"errors": "invalid JSON"}));
    };

    if let Some(status) = store.reject_writes_with {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
        return json_response(status, json!({"errors": ["write rejected by mock"]}));
    }

    if request.location_id != store.location_id {
        return json_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"errors": ["Inventory item is not stocked at the location"]}),
        );
    }

    let mut items = store.items.lock();
    let Some(item) = items.values_mut().find(|i| i.inventory_item_id == request.inventory_item_id)
    else {
        return json_response(StatusCode::NOT_FOUND, json!({"errors": "Not Found"}));
    };

    println!(
        "[MOCK] item {} available {} -> {}",
        item.inventory_item_id, item.available, request.available
    );
    item.available = request.available;

    json_response(
        StatusCode::OK,
        json!({"inventory_level": {
            "inventory_item_id": item.inventory_item_id,
            "location_id": store.location_id,
            "available": item.available,
        }}),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut items = FxHashMap::default();
    for (i, (barcode, available)) in args.stock.iter().enumerate() {
        let n = i as i64 + 1;
        items.insert(
            barcode.clone(),
            Item { variant_id: 5000 + n, inventory_item_id: 9000 + n, available: *available },
        );
        println!("[MOCK] Seeded barcode {} (item {}) available {}", barcode, 9000 + n, available);
    }

    let store = Arc::new(Store {
        location_id: args.location_id,
        reject_writes_with: args.reject_writes_with,
        items: Mutex::new(items),
    });

    let listener = TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;
    println!("[MOCK] Shopify mock listening on port {} (location {})", args.port, args.location_id);

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let store = store.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, store.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                eprintln!("[MOCK] Connection error from {}: {}", peer, e);
            }
        });
    }
}
