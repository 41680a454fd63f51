//! Thin CLI wrapper demonstrating the near-duplicate index end to end
//! against the in-memory backend. Not a product-grade CLI — tokenization,
//! data loading, and output formatting are all out of scope for this
//! crate; this exists so the
//! `(token, weight) -> Fingerprint -> Index` contract is runnable.

use anyhow::{Context, Result};
use argh::FromArgs;

use simhash_lsh_index::{
    FeatureInput, FingerprintBuilder, IdentifiedIndex, IndexConfig, MemoryMapStorage,
    MemoryStorage,
};

/// Index a handful of lines of text and report near-duplicates against
/// each other.
#[derive(FromArgs)]
struct Args {
    /// hamming-distance tolerance
    #[argh(option, default = "3")]
    k: usize,

    /// a document to index; pass --doc once per document
    #[argh(option)]
    doc: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Args = argh::from_env();
    if args.doc.is_empty() {
        anyhow::bail!("pass at least one --doc \"...\" to index");
    }

    let config = IndexConfig {
        f: 64,
        k: args.k,
        ..IndexConfig::default()
    };
    let index = IdentifiedIndex::new(config, MemoryStorage::new(), MemoryMapStorage::new());
    let builder = FingerprintBuilder::new(64).context("building fingerprint builder")?;

    for (i, line) in args.doc.iter().enumerate() {
        let id = format!("line-{i}");
        let tokens: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
        let fp = builder
            .build(FeatureInput::Tokens(tokens))
            .with_context(|| format!("fingerprinting {id}"))?;

        let hits = index.get_near_dups_and_add(fp, id.clone()).await?;
        if hits.is_empty() {
            println!("{id}: {line:?} — no near-duplicates, indexed");
        } else {
            println!("{id}: {line:?} — near-duplicates of {hits:?}");
        }
    }

    Ok(())
}
