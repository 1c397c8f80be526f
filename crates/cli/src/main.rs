use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::artifacts::{ADJACENCY_FILE, ITEM_INDEX_FILE, MOVIES_FILE, USER_INDEX_FILE};
use data_loader::{parser, write_adjacency};
use lookup::{Catalog, IndexMap, DEFAULT_CUTOFF};
use ngcf::SparseAdjacency;
use rand::seq::IndexedRandom;
use server::{MovieRecommendation, Recommender};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// ngcf-recs - offline access to the NGCF recommender
#[derive(Parser)]
#[command(name = "ngcf-recs")]
#[command(about = "Movie recommendations from a pretrained NGCF graph model", long_about = None)]
struct Cli {
    /// Directory holding the model artifacts
    #[arg(short, long, default_value = "artifacts")]
    artifacts: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get movie recommendations for a user
    Recommend {
        /// External user ID
        #[arg(long)]
        user_id: i64,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Print the model score next to each title
        #[arg(long)]
        scores: bool,
    },

    /// Recommend from a movie title, via the user closest to that movie
    Similar {
        /// Movie title; close misspellings are accepted
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Search for movies by title
    Search {
        /// Movie title to search for (case-insensitive substring match)
        #[arg(long)]
        title: String,
    },

    /// Rebuild graph_adj.dat from a ratings file and the id mappings
    BuildGraph {
        /// userId::movieId::rating::timestamp file
        #[arg(long)]
        ratings: PathBuf,

        /// Output path; defaults to graph_adj.dat inside the artifact directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "1000")]
        requests: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,cli=info")),
        )
        .init();

    let cli = Cli::parse();

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend {
            user_id,
            limit,
            scores,
        } => handle_recommend(&load_recommender(&cli.artifacts)?, user_id, limit, scores)?,
        Commands::Similar { title, limit } => {
            handle_similar(&load_recommender(&cli.artifacts)?, &title, limit)?
        }
        Commands::Search { title } => handle_search(&cli.artifacts, &title)?,
        Commands::BuildGraph { ratings, out } => {
            let out = out.unwrap_or_else(|| cli.artifacts.join(ADJACENCY_FILE));
            handle_build_graph(&cli.artifacts, &ratings, &out)?
        }
        Commands::Benchmark { requests } => {
            let recommender = Arc::new(load_recommender(&cli.artifacts)?);
            handle_benchmark(recommender, requests).await?
        }
    }

    Ok(())
}

/// Load artifacts and run propagation (this may take a moment)
fn load_recommender(artifacts: &Path) -> Result<Recommender> {
    println!("Loading model artifacts from {}...", artifacts.display());
    let start = Instant::now();
    let recommender = Recommender::load(artifacts, DEFAULT_CUTOFF)
        .context("Failed to load model artifacts")?;
    println!("{} Model ready in {:?}", "✓".green(), start.elapsed());
    Ok(recommender)
}

/// Handle the 'recommend' command
fn handle_recommend(
    recommender: &Recommender,
    user_id: i64,
    limit: usize,
    scores: bool,
) -> Result<()> {
    let recommendations = recommender.recommend_for_user(user_id, limit)?;
    println!(
        "{}",
        format!("Recommendations for user {}:", user_id).bold().blue()
    );
    print_recommendations(&recommendations, scores);
    Ok(())
}

/// Handle the 'similar' command
fn handle_similar(recommender: &Recommender, title: &str, limit: usize) -> Result<()> {
    let result = recommender.recommend_for_title(title, limit)?;
    if result.input_movie != title {
        println!("Matched '{}' to {}", title, result.input_movie.bold());
    }
    println!(
        "{}",
        format!(
            "Because you like {} (closest user: {}):",
            result.input_movie, result.user_like
        )
        .bold()
        .blue()
    );
    print_recommendations(&result.recommendations, false);
    Ok(())
}

/// Handle the 'search' command
fn handle_search(artifacts: &Path, title: &str) -> Result<()> {
    let movies = parser::parse_movies(&artifacts.join(MOVIES_FILE))
        .context("Failed to load movie catalog")?;
    let catalog = Catalog::from_movies(movies);
    let matches = catalog.search(title);

    println!("{}", format!("Search results for '{}':", title).bold().blue());
    if matches.is_empty() {
        println!("  no titles contain '{}'", title);
    }
    // Display top 20 results with movie ID, title and genres
    for movie in matches.iter().take(20) {
        let genres = movie
            .genres
            .iter()
            .map(|g| g.label())
            .collect::<Vec<_>>()
            .join(", ");
        println!("{}: {} [{}]", movie.id, movie.title, genres);
    }
    Ok(())
}

/// Handle the 'build-graph' command
fn handle_build_graph(artifacts: &Path, ratings_path: &Path, out: &Path) -> Result<()> {
    let users = parser::parse_id_mappings(&artifacts.join(USER_INDEX_FILE))
        .context("Failed to load user mapping")?;
    let items = parser::parse_id_mappings(&artifacts.join(ITEM_INDEX_FILE))
        .context("Failed to load item mapping")?;
    let index = IndexMap::from_mappings(&users, &items)?;
    let ratings = parser::parse_ratings(ratings_path).context("Failed to load ratings")?;

    let interactions: Vec<(usize, usize)> = ratings
        .iter()
        .filter_map(|r| Some((index.user_index(r.user_id)?, index.item_index(r.movie_id)?)))
        .collect();
    let skipped = ratings.len() - interactions.len();
    info!(
        "{} of {} ratings map onto the model ({} skipped)",
        interactions.len(),
        ratings.len(),
        skipped
    );

    let adjacency =
        SparseAdjacency::from_interactions(index.num_users(), index.num_items(), interactions)?;
    write_adjacency(out, &adjacency.entries())
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "{} Wrote {} edges over {} nodes to {} ({} ratings skipped)",
        "✓".green(),
        adjacency.nnz(),
        adjacency.num_nodes(),
        out.display(),
        skipped
    );
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(recommender: Arc<Recommender>, requests: usize) -> Result<()> {
    if requests == 0 {
        return Err(anyhow!("--requests must be at least 1"));
    }

    // Sample known users so every request exercises the full path
    let mut rng = rand::rng();
    let user_ids: Vec<i64> = (0..requests)
        .map(|_| {
            recommender
                .user_ids()
                .choose(&mut rng)
                .map(|&id| i64::from(id))
                .ok_or_else(|| anyhow!("Model has no users"))
        })
        .collect::<Result<_>>()?;

    let wall = Instant::now();
    let mut handles = Vec::with_capacity(requests);
    for user in user_ids {
        let recommender = recommender.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            recommender.recommend_for_user(user, 10)?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }
    let mut timings = Vec::with_capacity(requests);
    for handle in handles {
        timings.push(handle.await??);
    }
    let total_time = wall.elapsed();

    timings.sort();
    let latency_sum: Duration = timings.iter().sum();
    let avg_latency = latency_sum / timings.len() as u32;
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];
    let throughput = requests as f64 / total_time.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {}", requests);
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// One ranked line. MovieLens titles already carry the year.
fn format_recommendation(rank: usize, rec: &MovieRecommendation) -> String {
    format!(
        "{}. {} [{}]",
        rank.to_string().green(),
        rec.title,
        rec.genres.join(", ")
    )
}

/// Helper function to format and print recommendations
fn print_recommendations(recommendations: &[MovieRecommendation], scores: bool) {
    if recommendations.is_empty() {
        println!("  no recommendations");
    }
    for (i, rec) in recommendations.iter().enumerate() {
        let line = format_recommendation(i + 1, rec);
        if scores {
            println!("{} - Score: {:.4}", line, rec.score);
        } else {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_line_shows_year_once() {
        let rec = MovieRecommendation {
            movie_id: 1,
            title: "Toy Story (1995)".to_string(),
            year: Some(1995),
            genres: vec!["Animation".to_string(), "Comedy".to_string()],
            score: 0.5,
        };
        let line = format_recommendation(1, &rec);

        assert!(line.ends_with("Toy Story (1995) [Animation, Comedy]"));
        assert_eq!(line.matches("1995").count(), 1);
    }
}
