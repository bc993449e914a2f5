use serde_json::Value;

/// Build the analysis prompt. Seeded exports carry `description`, live ones
/// only `content`, so either is accepted.
pub fn prepare_prompt(articles: &[Value]) -> String {
    let articles_text = articles
        .iter()
        .map(|article| {
            let title = text_field(article, &["title"]);
            let description = text_field(article, &["description", "content"]);
            format!("Title: {title}\nDescription: {description}\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Use the following articles to answer the questions:

{articles_text}

Please provide:
1. Analysis (2-5 pages)
2. Trading Ideas (1 for each market category that is related to the articles)
3. Tickers to watch (All related tickers, e.g., BTCUSD, ETHUSD, SOLUSD, etc.)

Format your response in clear sections with headers."
    )
}

fn text_field<'a>(article: &'a Value, keys: &[&str]) -> &'a str {
    keys.iter()
        .find_map(|key| article.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
}
