// ═══════════════════════════════════════════════════════════════════
// Provider Tests — extractors, retry policy, gold & egg fetchers
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use gold_egg_tracker_core::config::{EggSourceConfig, GoldSourceConfig};
use gold_egg_tracker_core::errors::CoreError;
use gold_egg_tracker_core::models::commodity::Commodity;
use gold_egg_tracker_core::providers::egg_100ppi::{EggPriceFetcher, EGG_UNIT_DIVISOR};
use gold_egg_tracker_core::providers::extract::{
    parse_price_text, SgeTableExtractor, TextPatternExtractor,
};
use gold_egg_tracker_core::providers::retry::RetryPolicy;
use gold_egg_tracker_core::providers::sge_gold::GoldPriceFetcher;
use gold_egg_tracker_core::providers::traits::{
    PageFetcher, PageRequest, PriceExtractor, PriceSource,
};

// ═══════════════════════════════════════════════════════════════════
// Test Helpers — Scripted page fetcher and fixtures
// ═══════════════════════════════════════════════════════════════════

/// Replays a fixed queue of responses and records every requested URL.
/// Once the queue is empty every request gets an HTTP 503.
struct ScriptedPages {
    responses: Mutex<VecDeque<Result<String, CoreError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedPages {
    fn new(responses: Vec<Result<String, CoreError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn always_failing() -> Arc<Self> {
        Self::new(vec![])
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedPages {
    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<String, CoreError> {
        self.calls.lock().unwrap().push(request.url.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(CoreError::HttpStatus {
                    status: 503,
                    url: request.url.to_string(),
                })
            })
    }
}

fn sge_page(rows: &[(&str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(code, close)| {
            format!(
                "<tr><td>2024-01-05</td><td>{code}</td><td>480.00</td><td>482.10</td><td>478.30</td><td>{close}</td><td>0.12%</td></tr>"
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <table class="daily_new_table">
          <thead><tr><th>日期</th><th>合约</th><th>开盘价</th><th>最高价</th><th>最低价</th><th>收盘价</th><th>涨跌幅</th></tr></thead>
          <tbody>{body}</tbody>
        </table>
        </body></html>"#
    )
}

fn egg_page(sentence: &str) -> String {
    format!(
        "<html><head><title>鸡蛋价格快讯</title></head><body><div class=\"news\"><p>{sentence}</p></div></body></html>"
    )
}

fn gold_config() -> GoldSourceConfig {
    GoldSourceConfig {
        url_template: "https://fixture.test/gold?start_date={date}&end_date={date}".into(),
        retry: RetryPolicy::immediate(3),
        ..Default::default()
    }
}

fn egg_config() -> EggSourceConfig {
    EggSourceConfig {
        url: "https://fixture.test/egg".into(),
        retry: RetryPolicy::immediate(3),
        ..Default::default()
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// parse_price_text
// ═══════════════════════════════════════════════════════════════════

mod price_text {
    use super::*;

    #[test]
    fn plain_decimal() {
        assert_eq!(parse_price_text("928.77"), Some(928.77));
    }

    #[test]
    fn strips_thousands_separators_and_whitespace() {
        assert_eq!(parse_price_text("  1,234.50 "), Some(1234.5));
    }

    #[test]
    fn placeholders_rejected() {
        for raw in ["", "-", "--", "—", "N/A", "   "] {
            assert_eq!(parse_price_text(raw), None, "placeholder {raw:?}");
        }
    }

    #[test]
    fn non_numeric_rejected() {
        assert_eq!(parse_price_text("abc"), None);
    }

    #[test]
    fn zero_and_negative_rejected() {
        assert_eq!(parse_price_text("0"), None);
        assert_eq!(parse_price_text("-5.0"), None);
    }

    #[test]
    fn non_finite_rejected() {
        assert_eq!(parse_price_text("inf"), None);
        assert_eq!(parse_price_text("NaN"), None);
    }
}

// ═══════════════════════════════════════════════════════════════════
// SgeTableExtractor
// ═══════════════════════════════════════════════════════════════════

mod sge_table {
    use super::*;

    #[test]
    fn finds_target_contract_close() {
        let page = sge_page(&[("Au99.95", "927.10"), ("Au99.99", "928.77"), ("Au100g", "929.00")]);
        let extractor = SgeTableExtractor::new("Au99.99");
        assert_eq!(extractor.extract_price(&page), Some(928.77));
    }

    #[test]
    fn thousands_separator_in_close() {
        let page = sge_page(&[("Au99.99", "1,028.40")]);
        assert_eq!(SgeTableExtractor::new("Au99.99").extract_price(&page), Some(1028.4));
    }

    #[test]
    fn prefixed_contract_code_matches() {
        let page = sge_page(&[("iAu99.99", "930.00")]);
        assert_eq!(SgeTableExtractor::new("Au99.99").extract_price(&page), Some(930.0));
    }

    #[test]
    fn longer_contract_code_does_not_match() {
        let page = sge_page(&[("Au99.995", "931.00")]);
        assert_eq!(SgeTableExtractor::new("Au99.99").extract_price(&page), None);
    }

    #[test]
    fn placeholder_close_is_no_price() {
        let page = sge_page(&[("Au99.99", "-")]);
        assert_eq!(SgeTableExtractor::new("Au99.99").extract_price(&page), None);
    }

    #[test]
    fn short_rows_are_skipped_not_fatal() {
        let page = r#"<table class="daily_new_table"><tbody>
            <tr><td>2024-01-05</td><td>Au99.99</td><td>480.00</td></tr>
            <tr><td>2024-01-05</td><td>Au99.99</td><td>1</td><td>2</td><td>3</td><td>928.77</td></tr>
        </tbody></table>"#;
        assert_eq!(SgeTableExtractor::new("Au99.99").extract_price(page), Some(928.77));
    }

    #[test]
    fn missing_table_is_no_price() {
        let page = "<html><body><p>系统维护中</p></body></html>";
        assert_eq!(SgeTableExtractor::new("Au99.99").extract_price(page), None);
    }

    #[test]
    fn table_with_other_class_is_ignored() {
        let page = sge_page(&[("Au99.99", "928.77")]).replace("daily_new_table", "other_table");
        assert_eq!(SgeTableExtractor::new("Au99.99").extract_price(&page), None);
    }

    #[test]
    fn ticker_accessor() {
        assert_eq!(SgeTableExtractor::new("Au99.99").ticker(), "Au99.99");
    }
}

// ═══════════════════════════════════════════════════════════════════
// TextPatternExtractor
// ═══════════════════════════════════════════════════════════════════

mod text_pattern {
    use super::*;

    #[test]
    fn primary_phrase() {
        let page = egg_page("今日全国鸡蛋参考价为 10.64 元/公斤，较昨日持平。");
        let extractor = TextPatternExtractor::egg_reference_price();
        assert_eq!(extractor.extract_price(&page), Some(10.64));
    }

    #[test]
    fn fallback_phrase() {
        let page = egg_page("主产区鸡蛋为9.80元/公斤");
        let extractor = TextPatternExtractor::egg_reference_price();
        assert_eq!(extractor.extract_price(&page), Some(9.8));
    }

    #[test]
    fn primary_wins_over_fallback() {
        let page = egg_page("鸡蛋为9.80元；鸡蛋参考价为10.64元");
        let extractor = TextPatternExtractor::egg_reference_price();
        assert_eq!(extractor.extract_price(&page), Some(10.64));
    }

    #[test]
    fn phrase_split_by_markup_still_matches() {
        let page = "<p>鸡蛋参考价为<strong>10.64</strong>元</p>";
        let extractor = TextPatternExtractor::egg_reference_price();
        assert_eq!(extractor.extract_price(page), Some(10.64));
    }

    #[test]
    fn integer_without_decimals_does_not_match() {
        let page = egg_page("鸡蛋参考价为 10 元");
        assert_eq!(TextPatternExtractor::egg_reference_price().extract_price(&page), None);
    }

    #[test]
    fn no_phrase_is_no_price() {
        let page = egg_page("猪肉价格小幅上涨");
        assert_eq!(TextPatternExtractor::egg_reference_price().extract_price(&page), None);
    }

    #[test]
    fn script_text_is_not_visible() {
        let page = r#"<html><head><script>var t = "鸡蛋参考价为 99.99";</script></head><body><p>暂无报价</p></body></html>"#;
        let extractor = TextPatternExtractor::egg_reference_price();
        assert!(!extractor.visible_text(page).contains("99.99"));
        assert_eq!(extractor.extract_price(page), None);
    }

    #[test]
    fn visible_text_strips_tags() {
        let extractor = TextPatternExtractor::egg_reference_price();
        let text = extractor.visible_text("<div><b>鸡蛋</b><i>参考价</i></div>");
        assert!(text.contains("鸡蛋参考价"));
        assert!(!text.contains('<'));
    }
}

// ═══════════════════════════════════════════════════════════════════
// RetryPolicy
// ═══════════════════════════════════════════════════════════════════

mod retry_policy {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_is_three_attempts_one_to_three_seconds() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.min_delay, Duration::from_secs(1));
        assert_eq!(p.max_delay, Duration::from_secs(3));
    }

    #[test]
    fn immediate_has_no_delay() {
        let p = RetryPolicy::immediate(3);
        assert_eq!(p.next_delay(), Duration::ZERO);
    }

    #[test]
    fn source_defaults() {
        let gold = GoldSourceConfig::default();
        assert_eq!(gold.retry.max_attempts, 3);
        assert_eq!(gold.retry.max_delay, Duration::from_secs(3));
        assert_eq!(gold.timeout, Duration::from_secs(20));
        assert_eq!(gold.lookback_days, 5);

        let egg = EggSourceConfig::default();
        assert_eq!(egg.retry.max_attempts, 3);
        assert_eq!(egg.retry.max_delay, Duration::from_secs(2));
        assert_eq!(egg.timeout, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn first_attempt_never_sleeps() {
        let p = RetryPolicy::new(3, Duration::from_secs(60), Duration::from_secs(60));
        let started = std::time::Instant::now();
        p.pause_before(1).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

// ═══════════════════════════════════════════════════════════════════
// GoldPriceFetcher
// ═══════════════════════════════════════════════════════════════════

mod gold_fetcher {
    use super::*;

    #[test]
    fn url_for_fills_both_dates() {
        let fetcher = GoldPriceFetcher::new(ScriptedPages::always_failing(), gold_config());
        assert_eq!(
            fetcher.url_for(date("2024-01-05")),
            "https://fixture.test/gold?start_date=2024-01-05&end_date=2024-01-05"
        );
    }

    #[test]
    fn candidate_dates_walk_back_five_days() {
        let fetcher = GoldPriceFetcher::new(ScriptedPages::always_failing(), gold_config());
        let dates = fetcher.candidate_dates(date("2024-01-08"));
        assert_eq!(
            dates,
            vec![
                date("2024-01-08"),
                date("2024-01-07"),
                date("2024-01-06"),
                date("2024-01-05"),
                date("2024-01-04"),
            ]
        );
    }

    #[tokio::test]
    async fn today_first_attempt_wins() {
        let pages = ScriptedPages::new(vec![Ok(sge_page(&[("Au99.99", "928.77")]))]);
        let fetcher = GoldPriceFetcher::new(pages.clone(), gold_config());

        let price = fetcher.fetch_price_as_of(date("2024-01-05")).await.unwrap();
        assert_eq!(price, 928.77);
        assert_eq!(pages.calls().len(), 1);
        assert!(pages.calls()[0].contains("2024-01-05"));
    }

    #[tokio::test]
    async fn retries_within_date_before_moving_back() {
        let pages = ScriptedPages::new(vec![
            Err(CoreError::Network("timeout".into())),
            Ok("<html><body>no table</body></html>".into()),
            Ok(sge_page(&[("Au99.99", "928.77")])),
        ]);
        let fetcher = GoldPriceFetcher::new(pages.clone(), gold_config());

        let price = fetcher.fetch_price_as_of(date("2024-01-05")).await.unwrap();
        assert_eq!(price, 928.77);
        let calls = pages.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|u| u.contains("2024-01-05")));
    }

    #[tokio::test]
    async fn falls_back_to_previous_trading_day() {
        // Weekend: Sunday yields an empty table three times, Saturday too,
        // Friday has the quote.
        let empty = sge_page(&[]);
        let mut responses: Vec<Result<String, CoreError>> =
            (0..6).map(|_| Ok(empty.clone())).collect();
        responses.push(Ok(sge_page(&[("Au99.99", "925.50")])));
        let pages = ScriptedPages::new(responses);
        let fetcher = GoldPriceFetcher::new(pages.clone(), gold_config());

        let price = fetcher.fetch_price_as_of(date("2024-01-07")).await.unwrap();
        assert_eq!(price, 925.5);

        let calls = pages.calls();
        assert_eq!(calls.len(), 7);
        assert!(calls[0].contains("2024-01-07"));
        assert!(calls[3].contains("2024-01-06"));
        assert!(calls[6].contains("2024-01-05"));
    }

    #[tokio::test]
    async fn exhausting_all_dates_and_attempts_fails() {
        let pages = ScriptedPages::always_failing();
        let fetcher = GoldPriceFetcher::new(pages.clone(), gold_config());

        let err = fetcher.fetch_price_as_of(date("2024-01-05")).await.unwrap_err();
        assert!(err.is_price_not_found());
        assert_eq!(err.to_string(), "gold price not found");
        assert_eq!(pages.calls().len(), 5 * 3);
    }

    #[tokio::test]
    async fn lookback_and_attempts_are_configurable() {
        let pages = ScriptedPages::always_failing();
        let config = GoldSourceConfig {
            lookback_days: 2,
            retry: RetryPolicy::immediate(2),
            ..gold_config()
        };
        let fetcher = GoldPriceFetcher::new(pages.clone(), config);

        assert!(fetcher.fetch_price_as_of(date("2024-01-05")).await.is_err());
        assert_eq!(pages.calls().len(), 4);
    }

    #[tokio::test]
    async fn custom_extractor_is_used() {
        struct Fixed;
        impl PriceExtractor for Fixed {
            fn extract_price(&self, _document: &str) -> Option<f64> {
                Some(1.5)
            }
        }

        let pages = ScriptedPages::new(vec![Ok(String::new())]);
        let fetcher = GoldPriceFetcher::with_extractor(pages, Box::new(Fixed), gold_config());
        assert_eq!(fetcher.fetch_price_as_of(date("2024-01-05")).await.unwrap(), 1.5);
    }

    #[test]
    fn reports_gold_commodity() {
        let fetcher = GoldPriceFetcher::new(ScriptedPages::always_failing(), gold_config());
        assert_eq!(fetcher.commodity(), Commodity::Gold);
    }
}

// ═══════════════════════════════════════════════════════════════════
// EggPriceFetcher
// ═══════════════════════════════════════════════════════════════════

mod egg_fetcher {
    use super::*;

    #[test]
    fn unit_divisor_is_two() {
        assert_eq!(EGG_UNIT_DIVISOR, 2.0);
    }

    #[tokio::test]
    async fn converts_quote_to_jin() {
        let pages = ScriptedPages::new(vec![Ok(egg_page("鸡蛋参考价为 10.64 元/公斤"))]);
        let fetcher = EggPriceFetcher::new(pages.clone(), egg_config());

        let price = fetcher.fetch_price().await.unwrap();
        assert!((price - 5.32).abs() < 1e-9);
        assert_eq!(pages.calls(), vec!["https://fixture.test/egg".to_string()]);
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt() {
        let pages = ScriptedPages::new(vec![
            Err(CoreError::HttpStatus {
                status: 502,
                url: "https://fixture.test/egg".into(),
            }),
            Ok(egg_page("暂无数据")),
            Ok(egg_page("鸡蛋为8.00")),
        ]);
        let fetcher = EggPriceFetcher::new(pages.clone(), egg_config());

        assert_eq!(fetcher.fetch_price().await.unwrap(), 4.0);
        assert_eq!(pages.calls().len(), 3);
    }

    #[tokio::test]
    async fn non_2xx_on_every_attempt_fails() {
        let pages = ScriptedPages::always_failing();
        let fetcher = EggPriceFetcher::new(pages.clone(), egg_config());

        let err = fetcher.fetch_price().await.unwrap_err();
        assert_eq!(err.to_string(), "egg price not found");
        assert!(matches!(err, CoreError::PriceNotFound { ref commodity } if commodity == "egg"));
        assert_eq!(pages.calls().len(), 3);
    }

    #[tokio::test]
    async fn never_walks_dates() {
        let pages = ScriptedPages::always_failing();
        let fetcher = EggPriceFetcher::new(pages.clone(), egg_config());
        let _ = fetcher.fetch_price().await;
        assert!(pages.calls().iter().all(|u| u == "https://fixture.test/egg"));
    }

    #[test]
    fn reports_egg_commodity() {
        let fetcher = EggPriceFetcher::new(ScriptedPages::always_failing(), egg_config());
        assert_eq!(fetcher.commodity(), Commodity::Egg);
    }
}

// ═══════════════════════════════════════════════════════════════════
// HTTP Page Fetcher — local socket, no network
// ═══════════════════════════════════════════════════════════════════

mod http_fetcher {
    use super::*;
    use gold_egg_tracker_core::providers::http::HttpPageFetcher;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn canned(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Answers one connection per canned response, in order, and returns the
    /// raw request heads it received.
    async fn serve(responses: Vec<String>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut heads = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
                heads.push(String::from_utf8_lossy(&head).to_ascii_lowercase());
            }
            heads
        });

        (base, handle)
    }

    fn request<'a>(url: &'a str, referer: Option<&'a str>) -> PageRequest<'a> {
        PageRequest {
            url,
            referer,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn non_success_status_is_http_status_error() {
        let (base, server) = serve(vec![
            canned("503 Service Unavailable", "busy"),
            canned("200 OK", "<p>鸡蛋参考价为 10.64</p>"),
        ])
        .await;
        let url = format!("{base}/quotation?start_date=2024-01-01");
        let fetcher = HttpPageFetcher::new();

        let err = fetcher.fetch_page(request(&url, None)).await.unwrap_err();
        assert!(matches!(err, CoreError::HttpStatus { status: 503, .. }));

        let body = fetcher.fetch_page(request(&url, None)).await.unwrap();
        assert_eq!(body, "<p>鸡蛋参考价为 10.64</p>");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn not_found_is_http_status_error_with_url() {
        let (base, server) = serve(vec![canned("404 Not Found", "")]).await;
        let url = format!("{base}/kx/");

        let err = HttpPageFetcher::new()
            .fetch_page(request(&url, None))
            .await
            .unwrap_err();
        match err {
            CoreError::HttpStatus { status, url: failed } => {
                assert_eq!(status, 404);
                assert_eq!(failed, url);
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }

        server.await.unwrap();
    }

    #[tokio::test]
    async fn sends_browser_headers_and_referer() {
        let (base, server) = serve(vec![canned("200 OK", "ok")]).await;
        let url = format!("{base}/kx/");

        let body = HttpPageFetcher::new()
            .fetch_page(request(&url, Some("https://egg.100ppi.com/")))
            .await
            .unwrap();
        assert_eq!(body, "ok");

        let heads = server.await.unwrap();
        let head = &heads[0];
        assert!(head.starts_with("get /kx/ "));
        assert!(head.contains("user-agent: mozilla/5.0"));
        assert!(head.contains("accept: text/html"));
        assert!(head.contains("accept-language: zh-cn"));
        assert!(head.contains("cache-control: no-cache"));
        assert!(head.contains("referer: https://egg.100ppi.com/"));
    }

    #[tokio::test]
    async fn referer_is_omitted_when_not_given() {
        let (base, server) = serve(vec![canned("200 OK", "ok")]).await;
        let url = format!("{base}/");

        HttpPageFetcher::new()
            .fetch_page(request(&url, None))
            .await
            .unwrap();

        let heads = server.await.unwrap();
        assert!(!heads[0].contains("referer:"));
    }
}
