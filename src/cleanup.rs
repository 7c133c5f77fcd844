use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::storage::ArtifactRepository;

/// Removes shared report files and cached PDFs older than `ttl`. Never fails; errors are logged.
pub async fn cleanup_expired_links(repo: &dyn ArtifactRepository, ttl: Duration) -> u64 {
    let ttl = ttl.max(Duration::zero());
    let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
        warn!(ttl_hours = ttl.num_hours(), "link ttl out of range, nothing removed");
        return 0;
    };
    match repo.delete_expired(cutoff).await {
        Ok(removed) => {
            if removed > 0 {
                info!(removed, %cutoff, "expired report links removed");
            }
            metrics::counter!("expired_links_removed_total").increment(removed);
            removed
        }
        Err(e) => {
            error!(error = %e, "failed to clean up expired report links");
            0
        }
    }
}

pub async fn run_periodic(repo: Arc<dyn ArtifactRepository>, ttl: Duration, every: std::time::Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        cleanup_expired_links(repo.as_ref(), ttl).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{SiteConfig, ttl_from_hours};
    use crate::storage::SqliteArtifactRepository;
    use tempfile::tempdir;

    #[tokio::test]
    async fn fresh_links_survive_and_zero_ttl_removes_them() {
        let dir = tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").to_string_lossy());
        let repo = SqliteArtifactRepository::initialize(Some(url)).await.unwrap();
        let name = repo.save_report_file("session-1", b"%PDF").await.unwrap();
        repo.put_cached_pdf("k", "session-1", b"%PDF").await.unwrap();

        assert_eq!(cleanup_expired_links(&repo, Duration::hours(24)).await, 0);
        assert!(repo.get_public_file(&name).await.unwrap().is_some());

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(cleanup_expired_links(&repo, Duration::zero()).await, 2);
        assert!(repo.get_public_file(&name).await.unwrap().is_none());
        assert!(repo.get_cached_pdf("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_ttl_keeps_fresh_links_and_negative_acts_as_zero() {
        let dir = tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").to_string_lossy());
        let repo = SqliteArtifactRepository::initialize(Some(url)).await.unwrap();
        let name = repo.save_report_file("session-2", b"%PDF").await.unwrap();

        let site = SiteConfig { link_ttl_hours: Some(u64::MAX), ..Default::default() };
        assert_eq!(cleanup_expired_links(&repo, site.link_ttl()).await, 0);
        assert_eq!(cleanup_expired_links(&repo, ttl_from_hours(1 << 62)).await, 0);
        assert!(repo.get_public_file(&name).await.unwrap().is_some());

        // a negative ttl is treated as zero, which only removes entries already in the past
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(cleanup_expired_links(&repo, Duration::hours(-1)).await, 1);
    }
}
