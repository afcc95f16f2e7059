//! Research pipeline: confirm academic citations against a bibliographic index.

use std::time::Duration;

use futures_util::StreamExt;

use crate::matching::{research_candidate_matches, research_query_title};
use crate::search::{BibliographicSearch, Publication, SearchError};
use crate::{Category, ResearchCitation, VerificationResult};

enum ScanOutcome {
    Matched(Publication),
    Exhausted,
    Failed(SearchError),
}

/// Verify one research citation.
///
/// Scans at most `scan_limit` candidates from the title+year search. When no
/// candidate matches (or the scan fails or times out), the nearest match from
/// an unconstrained lookup is reported as unconfirmed. If that lookup fails
/// too, the result is a placeholder with no URL. Never fails.
pub async fn verify_research_one(
    citation: &ResearchCitation,
    bibliographic: &dyn BibliographicSearch,
    scan_limit: usize,
    timeout: Duration,
) -> VerificationResult {
    let query = research_query_title(citation);
    let year = citation.year.trim();
    let source = bibliographic.name();

    let outcome = match tokio::time::timeout(
        timeout,
        scan(bibliographic, &query, year, &citation.author, scan_limit),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => ScanOutcome::Failed(SearchError::Timeout(timeout)),
    };

    match outcome {
        ScanOutcome::Matched(publication) => {
            tracing::debug!(title = %citation.title, source, "research citation confirmed");
            return VerificationResult::verified(
                &citation.title,
                Category::Research,
                publication.url,
                source,
            );
        }
        ScanOutcome::Exhausted => {
            tracing::debug!(title = %citation.title, scan_limit, "no matching candidate");
        }
        ScanOutcome::Failed(e) => {
            tracing::warn!(title = %citation.title, source, error = %e, "bibliographic search failed");
        }
    }

    match tokio::time::timeout(timeout, bibliographic.search_single_best(&query)).await {
        Ok(Ok(nearest)) => {
            VerificationResult::unconfirmed(&citation.title, Category::Research, nearest.url, source)
        }
        Ok(Err(e)) => {
            tracing::warn!(title = %citation.title, source, error = %e, "nearest-match lookup failed");
            VerificationResult::placeholder(&citation.title, Category::Research)
        }
        Err(_) => {
            tracing::warn!(title = %citation.title, source, "nearest-match lookup timed out");
            VerificationResult::placeholder(&citation.title, Category::Research)
        }
    }
}

async fn scan(
    bibliographic: &dyn BibliographicSearch,
    title: &str,
    year: &str,
    author: &str,
    scan_limit: usize,
) -> ScanOutcome {
    let mut candidates = bibliographic
        .search_by_title_year(title, year, year)
        .take(scan_limit);

    while let Some(candidate) = candidates.next().await {
        match candidate {
            Ok(publication) => {
                if research_candidate_matches(
                    title,
                    author,
                    &publication.title,
                    &publication.authors,
                ) {
                    return ScanOutcome::Matched(publication);
                }
                tracing::debug!(candidate = %publication.title, "candidate rejected");
            }
            Err(e) => return ScanOutcome::Failed(e),
        }
    }
    ScanOutcome::Exhausted
}
