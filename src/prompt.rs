/// Builds the single instruction prompt sent to the model. The same template
/// serves scraped and fallback corpora alike.
pub fn compose(corpus: &str, query: &str) -> String {
    format!(
        "
You're an AI learning a new language.
Here is the knowledge you gathered:

{corpus}

Now answer the following question in that language.

Q: {query}
A:
"
    )
    .trim()
    .to_string()
}
