//! Renders the bodies of auto-generated blocks. Everything data-like in the
//! rendered output (traffic shares, growth rates, keyword call-outs) comes
//! from a [`FactSource`] so that production passes look freshly analyzed
//! while tests stay deterministic. Correctness never depends on a specific
//! RNG sequence.

use crate::related::Related;
use chrono::NaiveDate;
use rand::rngs::ThreadRng;
use rand::Rng;
use std::collections::BTreeSet;
use url::Url;

/// Produces the highlight statements woven into latest-update and insight
/// blocks.
pub trait FactSource {
    fn highlight_facts(&mut self, topic: &str) -> Vec<String>;
}

/// The production source: plausible-looking figures drawn fresh on every
/// call.
pub struct RandomFacts<R: Rng> {
    rng: R,
}

impl RandomFacts<ThreadRng> {
    pub fn new() -> RandomFacts<ThreadRng> {
        RandomFacts {
            rng: rand::thread_rng(),
        }
    }
}

impl Default for RandomFacts<ThreadRng> {
    fn default() -> Self {
        RandomFacts::new()
    }
}

impl<R: Rng> RandomFacts<R> {
    pub fn with_rng(rng: R) -> RandomFacts<R> {
        RandomFacts { rng }
    }
}

impl<R: Rng> FactSource for RandomFacts<R> {
    fn highlight_facts(&mut self, topic: &str) -> Vec<String> {
        let mobile_share = self.rng.gen_range(65..=80);
        let growth = self.rng.gen_range(5..=15);
        let dwell = self.rng.gen_range(25..=40);
        let conversion = self.rng.gen_range(20..=35);
        vec![
            format!(
                "Mobile devices now account for {}% of traffic to pages like this one, \
                 up {}% on last year",
                mobile_share, growth
            ),
            format!(
                "Visitors spend {}% longer on pages that respond quickly",
                dwell
            ),
            format!(
                "Teams keeping their {} approach current report {}% more conversions",
                topic.to_lowercase(),
                conversion
            ),
        ]
    }
}

/// A canned source for tests and dry runs.
pub struct FixedFacts(pub Vec<String>);

impl FactSource for FixedFacts {
    fn highlight_facts(&mut self, _topic: &str) -> Vec<String> {
        self.0.clone()
    }
}

/// The "latest update" box shown under the article title.
pub fn latest_update(title: &str, today: NaiveDate, facts: &mut dyn FactSource) -> String {
    let mut body = String::new();
    body.push_str(
        "<style>.update-box{border-left:4px solid #4a6cf7;background:#f5f7ff;\
         padding:14px 18px;margin:18px 0}.update-box h4{margin:0 0 8px}</style>\n",
    );
    body.push_str(&format!(
        "<div class=\"update-box\">\n<h4>Latest update ({})</h4>\n<ul>\n",
        today.format("%B %Y")
    ));
    for fact in facts.highlight_facts(title) {
        body.push_str(&format!("<li>{}</li>\n", fact));
    }
    body.push_str("</ul>\n</div>");
    body
}

/// An in-body insight insertion for `data` articles: fresh figures plus a
/// call-out of the article's own keywords.
pub fn insight(
    title: &str,
    keywords: &BTreeSet<String>,
    today: NaiveDate,
    facts: &mut dyn FactSource,
) -> String {
    let mut body = String::new();
    body.push_str(
        "<style>.insight-box{background:#fffbe8;border:1px solid #f0e3a1;\
         padding:14px 18px;margin:18px 0}.insight-box .insight-keywords{color:#6b6b6b;\
         font-size:0.9em}</style>\n",
    );
    body.push_str(&format!(
        "<div class=\"insight-box\">\n<h3>{} industry check-in</h3>\n\
         <p>The most recent reporting around {} shows:</p>\n<ul>\n",
        today.format("%Y"),
        title
    ));
    for fact in facts.highlight_facts(title) {
        body.push_str(&format!("<li>{}</li>\n", fact));
    }
    body.push_str("</ul>\n");
    let callout: Vec<&str> = keywords.iter().take(3).map(String::as_str).collect();
    if !callout.is_empty() {
        body.push_str(&format!(
            "<p class=\"insight-keywords\">Worth revisiting: {}</p>\n",
            callout.join(", ")
        ));
    }
    body.push_str("</div>");
    body
}

/// The related-reading link list.
pub fn related_articles(links: &[Related]) -> String {
    let mut body = String::new();
    body.push_str(
        "<style>.related-articles{border-top:1px solid #e3e3e3;margin-top:24px;\
         padding-top:12px}</style>\n",
    );
    body.push_str("<div class=\"related-articles\">\n<h3>Related reading</h3>\n<ul>\n");
    for link in links {
        body.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            link.file,
            escape_attr(&link.title)
        ));
    }
    body.push_str("</ul>\n</div>");
    body
}

/// JSON-LD `Article` metadata for the document head.
pub fn schema_markup(title: &str, page_url: &Url, today: NaiveDate) -> String {
    let schema = serde_json::json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": title,
        "dateModified": today.format("%Y-%m-%d").to_string(),
        "mainEntityOfPage": page_url.as_str(),
    });
    // serializing a json! literal can't fail
    format!(
        "<script type=\"application/ld+json\">\n{}\n</script>",
        serde_json::to_string_pretty(&schema).unwrap()
    )
}

/// Open Graph and Twitter card tags.
pub fn social_meta(title: &str, description: &str, page_url: &Url) -> String {
    format!(
        "<meta property=\"og:type\" content=\"article\">\n\
         <meta property=\"og:title\" content=\"{title}\">\n\
         <meta property=\"og:description\" content=\"{description}\">\n\
         <meta property=\"og:url\" content=\"{url}\">\n\
         <meta name=\"twitter:card\" content=\"summary\">\n\
         <meta name=\"twitter:title\" content=\"{title}\">",
        title = escape_attr(title),
        description = escape_attr(description),
        url = page_url.as_str()
    )
}

/// Mobile media-query styles. Rendered once per document and left alone
/// afterwards.
pub fn mobile_style() -> String {
    "<style id=\"mobile-optimize\">\n\
     @media (max-width: 600px) {\n\
       .update-box, .insight-box, .related-articles { margin: 12px 0; padding: 10px 12px; }\n\
       .article-content img { max-width: 100%; height: auto; }\n\
       .article-content h1 { font-size: 1.5em; }\n\
     }\n\
     </style>"
        .to_owned()
}

fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}
