use std::fmt::Write as _;

use crate::models::band::{BandPosition, ReferenceBand, GOLD_EGG_BAND, GOLD_RICE_BAND};
use crate::models::commodity::Commodity;
use crate::models::record::PriceRecord;
use super::ratio_service::RatioCalculator;

/// Placeholder for anything that could not be fetched or computed.
pub const NOT_AVAILABLE: &str = "N/A";

/// Records shown in the mail's recent-history table.
pub const EMAIL_HISTORY_ROWS: usize = 7;

const CHART_JS_CDN: &str = "https://cdn.jsdelivr.net/npm/chart.js@4.4.0/dist/chart.umd.min.js";

/// Renders records into the console summary, the mail body, and the
/// static HTML dashboard. Pure functions over the data; the caller decides
/// where the output goes.
pub struct ReportFormatter;

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

impl ReportFormatter {
    pub fn new() -> Self {
        Self
    }

    // ── Text ────────────────────────────────────────────────────────

    /// Console block for one record: prices, ratios with band position, and
    /// a trailing warnings block when any fetch failed.
    pub fn format_summary(&self, record: &PriceRecord) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "日期: {}", record.date_key());

        for (commodity, price) in [
            (Commodity::Gold, record.gold_price),
            (Commodity::Egg, record.egg_price),
            (Commodity::Rice, record.rice_price),
        ] {
            match price {
                Some(p) => {
                    let _ = writeln!(out, "{}价格: {p:.2} {}", commodity.label(), commodity.unit());
                }
                None => {
                    let _ = writeln!(out, "{}价格: {NOT_AVAILABLE}", commodity.label());
                }
            }
        }

        let _ = writeln!(
            out,
            "{}",
            Self::ratio_line(Commodity::Egg, record.gold_egg_ratio, GOLD_EGG_BAND)
        );
        let _ = writeln!(
            out,
            "{}",
            Self::ratio_line(Commodity::Rice, record.gold_rice_ratio, GOLD_RICE_BAND)
        );

        if record.has_errors() {
            let _ = writeln!(out);
            let _ = writeln!(out, "警告:");
            for err in &record.errors {
                let _ = writeln!(out, "  - {err}");
            }
        }

        out
    }

    fn ratio_line(divisor: Commodity, ratio: Option<f64>, band: ReferenceBand) -> String {
        let name = format!("{}／{} 比例", Commodity::Gold.label(), divisor.label());
        match ratio {
            Some(r) => {
                let position = RatioCalculator::classify(r, band);
                format!(
                    "{name}: {r:.1} – {} 历史参考区间 {:.1}-{:.1}",
                    position.label(),
                    band.low,
                    band.high
                )
            }
            None => format!("{name}: {NOT_AVAILABLE}"),
        }
    }

    /// Alert banner shown at the top of the mail when gold is above `threshold`.
    pub fn alert_banner(record: &PriceRecord, threshold: f64) -> Option<String> {
        let gold = record.gold_price.filter(|g| *g > threshold)?;
        Some(format!(
            "⚠️ 金价预警：当前金价 {gold:.2} 元／克，已超过 {threshold:.2} 元／克"
        ))
    }

    /// Mail body: optional alert banner, the summary, then recent history.
    pub fn format_email_body(
        &self,
        record: &PriceRecord,
        history: &[PriceRecord],
        threshold: f64,
    ) -> String {
        let mut out = String::new();
        if let Some(banner) = Self::alert_banner(record, threshold) {
            let _ = writeln!(out, "{banner}");
            let _ = writeln!(out);
        }

        out.push_str(&self.format_summary(record));

        if !history.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "最近记录:");
            let _ = writeln!(out, "{:<12}{:>10}{:>10}{:>10}", "日期", "黄金", "鸡蛋", "比例");
            for r in history.iter().take(EMAIL_HISTORY_ROWS) {
                let _ = writeln!(
                    out,
                    "{:<12}{:>10}{:>10}{:>10}",
                    r.date_key(),
                    fmt_opt(r.gold_price, 2),
                    fmt_opt(r.egg_price, 2),
                    fmt_opt(r.gold_egg_ratio, 1)
                );
            }
        }

        out
    }

    // ── HTML dashboard ──────────────────────────────────────────────

    /// Full dashboard page for `history` (newest first, as stored).
    ///
    /// Stat cards show the newest record; charts and table cover the newest
    /// `window` records, charts in chronological order.
    pub fn render_html(&self, history: &[PriceRecord], window: usize, band: ReferenceBand) -> String {
        let latest = history.first();
        let recent = &history[..history.len().min(window)];

        let chronological: Vec<&PriceRecord> = recent.iter().rev().collect();
        let dates: Vec<String> = chronological.iter().map(|r| r.date_key()).collect();
        let gold: Vec<Option<f64>> = chronological.iter().map(|r| r.gold_price).collect();
        let egg: Vec<Option<f64>> = chronological.iter().map(|r| r.egg_price).collect();
        let ratios: Vec<Option<f64>> = chronological.iter().map(|r| r.gold_egg_ratio).collect();

        let ratio_class = match latest.and_then(|r| RatioCalculator::classify_opt(r.gold_egg_ratio, band)) {
            Some(BandPosition::Above) => "stat-value warning",
            _ => "stat-value",
        };
        let updated = latest
            .map(|r| r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let mut rows = String::new();
        for r in recent {
            let badge = if r.has_errors() {
                r#"<span class="error-badge">有错误</span>"#
            } else {
                r#"<span class="success-badge">正常</span>"#
            };
            let _ = write!(
                rows,
                "\n                    <tr>\n                        <td>{}</td>\n                        <td>{}</td>\n                        <td>{}</td>\n                        <td>{}</td>\n                        <td>{badge}</td>\n                    </tr>",
                r.date_key(),
                fmt_opt(r.gold_price, 2),
                fmt_opt(r.egg_price, 2),
                fmt_opt(r.gold_egg_ratio, 1),
            );
        }

        let mut html = String::with_capacity(16 * 1024);
        html.push_str("<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str("    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
        html.push_str("    <title>黄金/鸡蛋价格追踪 - Gold &amp; Egg Price Tracker</title>\n");
        let _ = writeln!(html, "    <script src=\"{CHART_JS_CDN}\"></script>");
        html.push_str("    <style>\n");
        html.push_str(DASHBOARD_CSS);
        html.push_str("    </style>\n</head>\n<body>\n    <div class=\"container\">\n");
        html.push_str("        <header>\n            <h1>🥇 黄金/鸡蛋价格追踪</h1>\n");
        html.push_str("            <p class=\"subtitle\">Gold &amp; Egg Price Tracker</p>\n        </header>\n\n");

        html.push_str("        <div class=\"stats-grid\">\n");
        Self::stat_card(&mut html, "黄金价格 Gold Price", "stat-value", &fmt_opt(latest.and_then(|r| r.gold_price), 2), Some("元/克"));
        Self::stat_card(&mut html, "鸡蛋价格 Egg Price", "stat-value", &fmt_opt(latest.and_then(|r| r.egg_price), 2), Some("元/斤"));
        Self::stat_card(&mut html, "黄金/鸡蛋比例 Gold/Egg Ratio", ratio_class, &fmt_opt(latest.and_then(|r| r.gold_egg_ratio), 1), None);
        html.push_str("        </div>\n\n");

        html.push_str("        <div class=\"chart-container\">\n            <h2 class=\"chart-title\">价格趋势图 Price Trends</h2>\n            <canvas id=\"priceChart\"></canvas>\n        </div>\n\n");
        html.push_str("        <div class=\"chart-container\">\n            <h2 class=\"chart-title\">黄金/鸡蛋比例趋势 Gold/Egg Ratio Trend</h2>\n            <canvas id=\"ratioChart\"></canvas>\n        </div>\n\n");

        html.push_str("        <div class=\"data-table\">\n            <h2 class=\"chart-title\">历史数据 Historical Data</h2>\n            <table>\n                <thead>\n                    <tr>\n");
        html.push_str("                        <th>日期</th>\n                        <th>黄金价格<br>(元/克)</th>\n                        <th>鸡蛋价格<br>(元/斤)</th>\n                        <th>黄金/鸡蛋比例</th>\n                        <th>状态</th>\n");
        html.push_str("                    </tr>\n                </thead>\n                <tbody>");
        html.push_str(&rows);
        html.push_str("\n                </tbody>\n            </table>\n        </div>\n\n");

        let _ = write!(
            html,
            "        <footer>\n            <div class=\"update-time\">最后更新: {updated}</div>\n            <p style=\"margin-top: 20px;\">数据来源: 上海黄金交易所 (SGE) &amp; 中国鸡蛋产业网</p>\n        </footer>\n    </div>\n\n"
        );

        html.push_str("    <script>\n");
        let _ = writeln!(html, "        const labels = {};", json_array(&dates));
        let _ = writeln!(html, "        const goldPrices = {};", json_array(&gold));
        let _ = writeln!(html, "        const eggPrices = {};", json_array(&egg));
        let _ = writeln!(html, "        const ratios = {};", json_array(&ratios));
        let _ = writeln!(html, "        const bandHigh = {};", band.high);
        let _ = writeln!(html, "        const bandLow = {};", band.low);
        html.push_str(CHART_SCRIPT);
        html.push_str("    </script>\n</body>\n</html>\n");

        html
    }

    fn stat_card(html: &mut String, label: &str, class: &str, value: &str, unit: Option<&str>) {
        let unit = unit
            .map(|u| format!("\n                    <span class=\"stat-unit\">{u}</span>"))
            .unwrap_or_default();
        let _ = write!(
            html,
            "            <div class=\"stat-card\">\n                <div class=\"stat-label\">{label}</div>\n                <div class=\"{class}\">\n                    {value}{unit}\n                </div>\n            </div>\n"
        );
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON literal for embedding in the page script. `None` becomes `null`.
fn json_array<T: serde::Serialize>(values: &[T]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

const DASHBOARD_CSS: &str = r#"        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            padding: 20px;
            color: #333;
        }
        .container { max-width: 1200px; margin: 0 auto; }
        header { text-align: center; color: white; margin-bottom: 30px; }
        h1 { font-size: 2.5em; margin-bottom: 10px; text-shadow: 2px 2px 4px rgba(0,0,0,0.3); }
        .subtitle { font-size: 1.1em; opacity: 0.9; }
        .stats-grid {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(250px, 1fr));
            gap: 20px;
            margin-bottom: 30px;
        }
        .stat-card {
            background: white;
            border-radius: 15px;
            padding: 25px;
            box-shadow: 0 10px 30px rgba(0,0,0,0.2);
        }
        .stat-label { font-size: 0.9em; color: #666; margin-bottom: 8px; letter-spacing: 1px; }
        .stat-value { font-size: 2em; font-weight: bold; color: #667eea; }
        .stat-value.warning { color: #f39c12; }
        .stat-unit { font-size: 0.6em; color: #999; margin-left: 5px; }
        .chart-container, .data-table {
            background: white;
            border-radius: 15px;
            padding: 30px;
            margin-bottom: 30px;
            box-shadow: 0 10px 30px rgba(0,0,0,0.2);
        }
        .data-table { overflow-x: auto; }
        .chart-title { font-size: 1.3em; margin-bottom: 20px; text-align: center; }
        canvas { max-height: 400px; }
        table { width: 100%; border-collapse: collapse; }
        th { background: #667eea; color: white; padding: 15px; text-align: left; font-weight: 600; }
        td { padding: 12px 15px; border-bottom: 1px solid #eee; }
        tr:hover { background: #f8f9fa; }
        .error-badge, .success-badge {
            color: white;
            padding: 2px 8px;
            border-radius: 12px;
            font-size: 0.8em;
        }
        .error-badge { background: #e74c3c; }
        .success-badge { background: #27ae60; }
        footer { text-align: center; color: white; margin-top: 40px; opacity: 0.8; }
        .update-time {
            background: rgba(255,255,255,0.2);
            padding: 10px 20px;
            border-radius: 20px;
            display: inline-block;
        }
        @media (max-width: 768px) {
            h1 { font-size: 1.8em; }
            .stats-grid { grid-template-columns: 1fr; }
            .chart-container { padding: 15px; }
        }
"#;

const CHART_SCRIPT: &str = r#"
        new Chart(document.getElementById('priceChart').getContext('2d'), {
            type: 'line',
            data: {
                labels: labels,
                datasets: [
                    {
                        label: '黄金价格 (元/克)',
                        data: goldPrices,
                        borderColor: '#f39c12',
                        backgroundColor: 'rgba(243, 156, 18, 0.1)',
                        yAxisID: 'y',
                        tension: 0.4,
                        fill: true
                    },
                    {
                        label: '鸡蛋价格 (元/斤)',
                        data: eggPrices,
                        borderColor: '#3498db',
                        backgroundColor: 'rgba(52, 152, 219, 0.1)',
                        yAxisID: 'y1',
                        tension: 0.4,
                        fill: true
                    }
                ]
            },
            options: {
                responsive: true,
                interaction: { mode: 'index', intersect: false },
                scales: {
                    y: { type: 'linear', position: 'left', title: { display: true, text: '黄金价格 (元/克)' } },
                    y1: {
                        type: 'linear',
                        position: 'right',
                        title: { display: true, text: '鸡蛋价格 (元/斤)' },
                        grid: { drawOnChartArea: false }
                    }
                }
            }
        });

        new Chart(document.getElementById('ratioChart').getContext('2d'), {
            type: 'line',
            data: {
                labels: labels,
                datasets: [
                    {
                        label: '黄金/鸡蛋比例',
                        data: ratios,
                        borderColor: '#9b59b6',
                        backgroundColor: 'rgba(155, 89, 182, 0.1)',
                        tension: 0.4,
                        fill: true
                    },
                    {
                        label: '参考上限 (' + bandHigh + ')',
                        data: Array(labels.length).fill(bandHigh),
                        borderColor: '#e74c3c',
                        borderDash: [5, 5],
                        borderWidth: 2,
                        pointRadius: 0,
                        fill: false
                    },
                    {
                        label: '参考下限 (' + bandLow + ')',
                        data: Array(labels.length).fill(bandLow),
                        borderColor: '#27ae60',
                        borderDash: [5, 5],
                        borderWidth: 2,
                        pointRadius: 0,
                        fill: false
                    }
                ]
            },
            options: {
                responsive: true,
                interaction: { mode: 'index', intersect: false },
                scales: { y: { title: { display: true, text: '比例值' } } }
            }
        });
"#;
