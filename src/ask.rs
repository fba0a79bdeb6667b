//! `dsr ask` — run the query pipeline from the command line.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::providers;
use crate::query;
use crate::sqlite_store::SqliteStore;

pub async fn run_ask(
    config: &Config,
    query_text: &str,
    owner: &str,
    limit: Option<usize>,
) -> Result<()> {
    let generator = providers::create_embedding_generator(&config.embedding)?;
    let synthesizer = providers::create_answer_synthesizer(&config.synthesis)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool, generator.model_name(), generator.dims());

    let result = query::answer(
        &store,
        generator.as_ref(),
        synthesizer.as_ref(),
        query_text,
        owner,
        limit,
    )
    .await;

    store.pool().close().await;

    match result {
        Ok(answer) => {
            println!("{}", answer.response);
            if answer.degraded {
                eprintln!("Warning: synthesis unavailable, printed the fallback answer");
            }
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{}", e)),
    }
}
