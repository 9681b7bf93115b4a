use std::collections::BTreeMap;
use std::time::Duration;

use eyre::{Result, WrapErr, eyre};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::scholar::{AuthorMetrics, ScholarProfile, ScholarPublication};
use crate::utils::cache::now_timestamp;
use crate::utils::config::CitationsConfig;

const PAGE_SIZE: usize = 100;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static NAME: Lazy<Selector> = Lazy::new(|| Selector::parse("#gsc_prf_in").unwrap());
static STATS_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td.gsc_rsb_std").unwrap());
static HISTOGRAM_YEAR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.gsc_g_t").unwrap());
static HISTOGRAM_BAR: Lazy<Selector> = Lazy::new(|| Selector::parse("a.gsc_g_a").unwrap());
static HISTOGRAM_VALUE: Lazy<Selector> = Lazy::new(|| Selector::parse("span.gsc_g_al").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr.gsc_a_tr").unwrap());
static ROW_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("a.gsc_a_at").unwrap());
static ROW_CITATIONS: Lazy<Selector> = Lazy::new(|| Selector::parse("a.gsc_a_ac").unwrap());
static ROW_YEAR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.gsc_a_h").unwrap());
static Z_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"z-index:\s*(\d+)").unwrap());

pub struct ScholarScraper {
    base_url: String,
    delay: Duration,
    client: reqwest::Client,
}

impl ScholarScraper {
    pub fn new(config: &CitationsConfig) -> Self {
        ScholarScraper {
            base_url: config.scholar_base.trim_end_matches('/').to_string(),
            delay: config.request_delay(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_page(&self, author_id: &str, cstart: usize) -> Result<String> {
        let url = format!(
            "{}/citations?user={}&hl=en&cstart={}&pagesize={}",
            self.base_url, author_id, cstart, PAGE_SIZE
        );
        debug!("fetching {}", url);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    /// Fetches the author profile and every listed publication
    pub async fn fetch_profile(&self, author_id: &str) -> Result<ScholarProfile> {
        info!("fetching Google Scholar profile {}", author_id);

        let first_page = self
            .fetch_page(author_id, 0)
            .await
            .wrap_err_with(|| format!("failed to fetch Google Scholar profile {}", author_id))?;

        let name = parse_author_name(&first_page)
            .ok_or_else(|| eyre!("no author profile found for {}", author_id))?;
        let metrics = parse_metrics(&first_page);
        let mut publications = parse_publications(&first_page);
        let mut last_page_len = publications.len();

        info!("found author: {}", name);

        let mut cstart = 0;
        while last_page_len >= PAGE_SIZE {
            cstart += PAGE_SIZE;
            tokio::time::sleep(self.delay).await;

            match self.fetch_page(author_id, cstart).await {
                Ok(page) => {
                    let mut more = parse_publications(&page);
                    last_page_len = more.len();
                    publications.append(&mut more);
                }
                Err(e) => {
                    warn!("stopping at publication {}: {}", cstart, e);
                    break;
                }
            }
        }

        info!("fetched {} publications from Google Scholar", publications.len());

        Ok(ScholarProfile {
            name,
            metrics,
            publications,
        })
    }
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

pub fn parse_author_name(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&NAME)
        .next()
        .map(text_of)
        .filter(|name| !name.is_empty())
}

/// Reads the citations/h-index/i10-index table and the citations-per-year histogram
pub fn parse_metrics(html: &str) -> AuthorMetrics {
    let document = Html::parse_document(html);

    let values: Vec<u64> = document
        .select(&STATS_CELL)
        .map(|cell| parse_count(&text_of(cell)).unwrap_or(0))
        .collect();
    if values.len() < 6 {
        warn!("expected 6 values in the metrics table, found {}", values.len());
    }
    let value = |i: usize| values.get(i).copied().unwrap_or(0);

    let years: Vec<i32> = document
        .select(&HISTOGRAM_YEAR)
        .filter_map(|year| text_of(year).parse().ok())
        .collect();
    let mut counts = vec![0u64; years.len()];

    // Bars are positioned from the most recent year: z-index 1 is the last one
    for bar in document.select(&HISTOGRAM_BAR) {
        let position = bar
            .value()
            .attr("style")
            .and_then(|style| Z_INDEX.captures(style))
            .and_then(|caps| caps[1].parse::<usize>().ok());
        let count = bar
            .select(&HISTOGRAM_VALUE)
            .next()
            .and_then(|value| parse_count(&text_of(value)));

        if let (Some(position), Some(count)) = (position, count)
            && (1..=years.len()).contains(&position)
        {
            counts[years.len() - position] = count;
        }
    }

    AuthorMetrics {
        total_citations: value(0),
        total_citations_5y: value(1),
        h_index: value(2),
        h_index_5y: value(3),
        i10_index: value(4),
        i10_index_5y: value(5),
        cites_per_year: years.into_iter().zip(counts).collect::<BTreeMap<_, _>>(),
    }
}

pub fn parse_publications(html: &str) -> Vec<ScholarPublication> {
    let document = Html::parse_document(html);
    let fetched_at = now_timestamp();

    document
        .select(&ROW)
        .filter_map(|row| {
            let title = row.select(&ROW_TITLE).next().map(text_of)?;
            if title.is_empty() {
                debug!("skipping publication row without a title");
                return None;
            }

            let citations = row
                .select(&ROW_CITATIONS)
                .next()
                .and_then(|cell| parse_count(&text_of(cell)))
                .unwrap_or(0);
            let year = row
                .select(&ROW_YEAR)
                .next()
                .and_then(|cell| text_of(cell).parse().ok());

            Some(ScholarPublication {
                title,
                citations,
                year,
                fetched_at: fetched_at.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
<html><body>
  <div id="gsc_prf_in">Marine Denolle</div>
  <table id="gsc_rsb_st">
    <tr><td class="gsc_rsb_sc1">Citations</td><td class="gsc_rsb_std">4,321</td><td class="gsc_rsb_std">2100</td></tr>
    <tr><td class="gsc_rsb_sc1">h-index</td><td class="gsc_rsb_std">32</td><td class="gsc_rsb_std">25</td></tr>
    <tr><td class="gsc_rsb_sc1">i10-index</td><td class="gsc_rsb_std">60</td><td class="gsc_rsb_std">48</td></tr>
  </table>
  <div class="gsc_md_hist_b">
    <span class="gsc_g_t">2021</span><span class="gsc_g_t">2022</span><span class="gsc_g_t">2023</span>
    <a class="gsc_g_a" style="left:10px;z-index:3"><span class="gsc_g_al">300</span></a>
    <a class="gsc_g_a" style="left:40px;z-index:1"><span class="gsc_g_al">520</span></a>
  </div>
  <table id="gsc_a_t"><tbody>
    <tr class="gsc_a_tr">
      <td><a class="gsc_a_at">Strong ground motion prediction using virtual earthquakes</a></td>
      <td><a class="gsc_a_ac">450</a></td>
      <td class="gsc_a_y"><span class="gsc_a_h">2014</span></td>
    </tr>
    <tr class="gsc_a_tr">
      <td><a class="gsc_a_at">A preprint nobody cited yet</a></td>
      <td><a class="gsc_a_ac"></a></td>
      <td class="gsc_a_y"><span class="gsc_a_h"></span></td>
    </tr>
    <tr class="gsc_a_tr"><td>broken row</td></tr>
  </tbody></table>
</body></html>
"#;

    #[test]
    fn parses_author_name() {
        assert_eq!(parse_author_name(PROFILE).as_deref(), Some("Marine Denolle"));
        assert!(parse_author_name("<html></html>").is_none());
    }

    #[test]
    fn parses_metrics_table_and_histogram() {
        let metrics = parse_metrics(PROFILE);

        assert_eq!(metrics.total_citations, 4321);
        assert_eq!(metrics.total_citations_5y, 2100);
        assert_eq!(metrics.h_index, 32);
        assert_eq!(metrics.h_index_5y, 25);
        assert_eq!(metrics.i10_index, 60);
        assert_eq!(metrics.i10_index_5y, 48);
        assert_eq!(metrics.cites_per_year.get(&2021), Some(&300));
        assert_eq!(metrics.cites_per_year.get(&2022), Some(&0));
        assert_eq!(metrics.cites_per_year.get(&2023), Some(&520));
    }

    #[test]
    fn parses_rows_and_skips_broken_ones() {
        let publications = parse_publications(PROFILE);

        assert_eq!(publications.len(), 2);
        assert_eq!(publications[0].citations, 450);
        assert_eq!(publications[0].year, Some(2014));
        assert_eq!(publications[1].citations, 0);
        assert_eq!(publications[1].year, None);
    }

    #[test]
    fn empty_page_has_default_metrics() {
        let metrics = parse_metrics("<html><body></body></html>");
        assert_eq!(metrics, AuthorMetrics::default());
    }
}
