//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations with proper
//! error handling and transaction support. Creates and updates that touch
//! association tables run inside one transaction so a paper and its
//! author/tag links commit together or not at all.

use crate::db::models::*;
use crate::db::models::{author, paper, paper_author, paper_tag, tag, venue};
use crate::db::DbPool;
use crate::dedup::merge::{selected_fields, MergeMode, MergeableField};
use crate::errors::{AppError, Result};
use crate::query::{self, FilterCondition, FilterGroup, JoinRequirements, SkipReason};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
    Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Incoming paper payload shared by create, import and merge paths
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperDraft {
    pub title: String,
    pub abstract_text: Option<String>,
    pub publication_year: i32,
    pub doi: Option<String>,
    #[serde(default)]
    pub citation_count: i32,
    pub venue_id: Option<i32>,
    pub url: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub author_ids: Vec<i32>,
    #[serde(default)]
    pub tag_ids: Vec<i32>,
}

/// Partial update. `None` leaves the stored value untouched; a supplied
/// author or tag list fully replaces the existing association set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperPatch {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub publication_year: Option<i32>,
    pub doi: Option<String>,
    pub citation_count: Option<i32>,
    pub venue_id: Option<i32>,
    pub url: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub pdf_file_path: Option<String>,
    pub file_size: Option<i64>,
    pub author_ids: Option<Vec<i32>>,
    pub tag_ids: Option<Vec<i32>>,
}

/// A paper together with its venue, ordered authors and tags
#[derive(Debug, Clone, Serialize)]
pub struct PaperDetails {
    pub paper: Paper,
    pub venue: Option<Venue>,
    pub authors: Vec<AuthorLink>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorLink {
    pub author_order: i32,
    pub is_corresponding: bool,
    pub author: Author,
}

/// Flat AND parameters for the simple search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    pub title_keyword: Option<String>,
    pub author_name: Option<String>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub min_citations: Option<i32>,
    pub max_citations: Option<i32>,
    pub abstract_keyword: Option<String>,
    pub venue_id: Option<i32>,
    pub tags: Option<Vec<String>>,
}

impl SearchFilters {
    /// Lower the flat parameter set into a single AND filter group so both
    /// search endpoints run through the same compiler.
    pub fn into_filter_group(self) -> FilterGroup {
        fn cond(field: &str, operator: &str, value: serde_json::Value) -> FilterCondition {
            FilterCondition {
                id: None,
                field: field.to_string(),
                operator: operator.to_string(),
                value,
            }
        }

        let mut conditions = Vec::new();
        if let Some(v) = self.title_keyword {
            conditions.push(cond("title_keyword", "contains", v.into()));
        }
        if let Some(v) = self.abstract_keyword {
            conditions.push(cond("abstract_keyword", "contains", v.into()));
        }
        if let Some(v) = self.author_name {
            conditions.push(cond("author_name", "contains", v.into()));
        }
        if let Some(v) = self.year_from {
            conditions.push(cond("year_from", "greater_equal", v.into()));
        }
        if let Some(v) = self.year_to {
            conditions.push(cond("year_to", "less_equal", v.into()));
        }
        if let Some(v) = self.min_citations {
            conditions.push(cond("min_citations", "greater_equal", v.into()));
        }
        if let Some(v) = self.max_citations {
            conditions.push(cond("max_citations", "less_equal", v.into()));
        }
        if let Some(v) = self.venue_id {
            conditions.push(cond("venue_id", "equals", v.into()));
        }
        if let Some(v) = self.tags {
            conditions.push(cond("tags", "in", v.into()));
        }

        FilterGroup::all_of(conditions)
    }
}

/// Drop duplicate ids while preserving first-seen order
fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Trimmed DOI, or None when blank
fn normalized_doi(doi: &Option<String>) -> Option<String> {
    doi.as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Empty keyword lists are stored as NULL
fn keywords_opt(keywords: &[String]) -> Option<Vec<String>> {
    let cleaned: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Case-insensitive DOI equality predicate
fn doi_ci_eq(doi: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col((paper::Entity, paper::Column::Doi))))
        .eq(doi.trim().to_lowercase())
}

/// Build the complex-search select: joins per the analyzer, compiled filter,
/// DISTINCT on the paper identity against join fan-out.
fn build_complex_select(root: &FilterGroup) -> Result<(Select<PaperEntity>, Vec<SkipReason>)> {
    let joins = JoinRequirements::analyze(root);
    let compiled = query::compile_with_report(root)?;

    let mut select = PaperEntity::find();
    if joins.author {
        select = select
            .join(JoinType::InnerJoin, paper_author::Relation::Paper.def().rev())
            .join(JoinType::InnerJoin, paper_author::Relation::Author.def());
    }
    if joins.tag {
        select = select
            .join(JoinType::InnerJoin, paper_tag::Relation::Paper.def().rev())
            .join(JoinType::InnerJoin, paper_tag::Relation::Tag.def());
    }
    if let Some(condition) = compiled.condition {
        select = select.filter(condition);
    }

    Ok((select.distinct(), compiled.skipped))
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    /// Create a paper with its full association set in one transaction
    pub async fn create_paper(&self, draft: PaperDraft) -> Result<PaperDetails> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::MissingField {
                field: "title".to_string(),
            });
        }

        let doi = normalized_doi(&draft.doi);
        if let Some(ref doi) = doi {
            if self.doi_conflicts(doi, None).await? {
                return Err(AppError::Duplicate {
                    message: format!("DOI {} already exists", doi),
                });
            }
        }

        if let Some(venue_id) = draft.venue_id {
            self.ensure_venue_exists(venue_id).await?;
        }
        let author_ids = dedup_ids(&draft.author_ids);
        let tag_ids = dedup_ids(&draft.tag_ids);
        self.ensure_authors_exist(&author_ids).await?;
        self.ensure_tags_exist(&tag_ids).await?;

        let txn = self.write_conn().begin().await?;
        let now = Utc::now();

        let inserted = paper::ActiveModel {
            title: Set(title),
            abstract_text: Set(draft.abstract_text.clone()),
            publication_year: Set(draft.publication_year),
            doi: Set(doi),
            citation_count: Set(draft.citation_count.max(0)),
            venue_id: Set(draft.venue_id),
            url: Set(draft.url.clone()),
            keywords: Set(keywords_opt(&draft.keywords)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        Self::replace_author_links(&txn, inserted.id, &author_ids).await?;
        Self::replace_tag_links(&txn, inserted.id, &tag_ids).await?;

        txn.commit().await?;

        tracing::info!(paper_id = inserted.id, "Paper created");

        self.find_paper(inserted.id)
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!("paper {} vanished after insert", inserted.id),
            })
    }

    /// Find a paper with its associations
    pub async fn find_paper(&self, id: i32) -> Result<Option<PaperDetails>> {
        let Some(found) = PaperEntity::find_by_id(id).one(self.read_conn()).await? else {
            return Ok(None);
        };
        Ok(self.load_details(vec![found]).await?.pop())
    }

    /// List papers with pagination, newest first
    pub async fn list_papers(&self, offset: u64, limit: u64) -> Result<Vec<PaperDetails>> {
        let papers = PaperEntity::find()
            .order_by_desc(paper::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;
        self.load_details(papers).await
    }

    /// Update a paper; a supplied author or tag list fully replaces the
    /// existing set. Returns None when the paper does not exist.
    pub async fn update_paper(&self, id: i32, patch: PaperPatch) -> Result<Option<PaperDetails>> {
        let Some(existing) = PaperEntity::find_by_id(id).one(self.write_conn()).await? else {
            return Ok(None);
        };

        if let Some(doi) = normalized_doi(&patch.doi) {
            if self.doi_conflicts(&doi, Some(id)).await? {
                return Err(AppError::Duplicate {
                    message: format!("DOI {} already exists", doi),
                });
            }
        }
        if let Some(venue_id) = patch.venue_id {
            self.ensure_venue_exists(venue_id).await?;
        }
        let author_ids = patch.author_ids.as_deref().map(dedup_ids);
        let tag_ids = patch.tag_ids.as_deref().map(dedup_ids);
        if let Some(ref ids) = author_ids {
            self.ensure_authors_exist(ids).await?;
        }
        if let Some(ref ids) = tag_ids {
            self.ensure_tags_exist(ids).await?;
        }

        let txn = self.write_conn().begin().await?;

        let mut model: paper::ActiveModel = existing.into();
        if let Some(v) = patch.title {
            model.title = Set(v.trim().to_string());
        }
        if let Some(v) = patch.abstract_text {
            model.abstract_text = Set(Some(v));
        }
        if let Some(v) = patch.publication_year {
            model.publication_year = Set(v);
        }
        if let Some(doi) = normalized_doi(&patch.doi) {
            model.doi = Set(Some(doi));
        }
        if let Some(v) = patch.citation_count {
            model.citation_count = Set(v.max(0));
        }
        if let Some(v) = patch.venue_id {
            model.venue_id = Set(Some(v));
        }
        if let Some(v) = patch.url {
            model.url = Set(Some(v));
        }
        if let Some(ref v) = patch.keywords {
            model.keywords = Set(keywords_opt(v));
        }
        if let Some(v) = patch.pdf_file_path {
            model.pdf_file_path = Set(Some(v));
        }
        if let Some(v) = patch.file_size {
            model.file_size = Set(Some(v));
        }
        model.updated_at = Set(Utc::now().into());
        model.update(&txn).await?;

        if let Some(ids) = author_ids {
            Self::replace_author_links(&txn, id, &ids).await?;
        }
        if let Some(ids) = tag_ids {
            Self::replace_tag_links(&txn, id, &ids).await?;
        }

        txn.commit().await?;

        self.find_paper(id).await
    }

    /// Delete a paper and its association rows
    pub async fn delete_paper(&self, id: i32) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        if PaperEntity::find_by_id(id).one(&txn).await?.is_none() {
            return Ok(false);
        }

        PaperAuthorEntity::delete_many()
            .filter(paper_author::Column::PaperId.eq(id))
            .exec(&txn)
            .await?;
        PaperTagEntity::delete_many()
            .filter(paper_tag::Column::PaperId.eq(id))
            .exec(&txn)
            .await?;
        CitationEntity::delete_many()
            .filter(
                Condition::any()
                    .add(citation::Column::CitingPaperId.eq(id))
                    .add(citation::Column::CitedPaperId.eq(id)),
            )
            .exec(&txn)
            .await?;
        PaperEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        tracing::info!(paper_id = id, "Paper deleted");
        Ok(true)
    }

    /// Record the stored PDF location on a paper
    pub async fn set_pdf_file(&self, id: i32, path: &str, size: i64) -> Result<Paper> {
        let existing = PaperEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or(AppError::PaperNotFound { id })?;

        let mut model: paper::ActiveModel = existing.into();
        model.pdf_file_path = Set(Some(path.to_string()));
        model.file_size = Set(Some(size));
        model.updated_at = Set(Utc::now().into());
        model.update(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Flat AND search over named parameters
    pub async fn search_papers(
        &self,
        filters: SearchFilters,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PaperDetails>> {
        let root = filters.into_filter_group();
        self.search_papers_complex(&root, offset, limit).await
    }

    /// Nested AND/OR filter tree search
    pub async fn search_papers_complex(
        &self,
        root: &FilterGroup,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PaperDetails>> {
        let (select, skipped) = build_complex_select(root)?;
        if !skipped.is_empty() {
            tracing::debug!(
                skipped = skipped.len(),
                reasons = ?skipped,
                "Dropped malformed filter conditions"
            );
            crate::metrics::record_skipped_conditions(skipped.len());
        }

        let papers = select
            .order_by_asc(paper::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        self.load_details(papers).await
    }

    // ========================================================================
    // Duplicate Detection Support
    // ========================================================================

    /// Exact case-insensitive DOI lookup
    pub async fn find_paper_by_doi_ci(&self, doi: &str) -> Result<Option<Paper>> {
        PaperEntity::find()
            .filter(doi_ci_eq(doi))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Exact raw-title lookup (used by the import duplicate check)
    pub async fn find_paper_by_exact_title(&self, title: &str) -> Result<Option<Paper>> {
        PaperEntity::find()
            .filter(paper::Column::Title.eq(title))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Match stored titles against a normalized candidate title: exact
    /// normalized equality, or containment of the probe substring. The
    /// normalization of stored titles happens here at comparison time.
    pub async fn find_papers_by_normalized_title(
        &self,
        normalized: &str,
        probe: &str,
        limit: u64,
    ) -> Result<Vec<Paper>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT * FROM papers
            WHERE lower(regexp_replace(btrim(title), '\s+', ' ', 'g')) = $1
               OR position($2 in lower(regexp_replace(btrim(title), '\s+', ' ', 'g'))) > 0
            ORDER BY (lower(regexp_replace(btrim(title), '\s+', ' ', 'g')) = $1) DESC, id ASC
            LIMIT $3
            "#,
            vec![normalized.into(), probe.into(), (limit as i64).into()],
        );

        PaperEntity::find()
            .from_raw_sql(stmt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Arbitrary recent papers, used as the no-strong-match fallback
    pub async fn recent_papers(&self, limit: u64) -> Result<Vec<Paper>> {
        PaperEntity::find()
            .order_by_desc(paper::Column::CreatedAt)
            .limit(limit)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Apply a merge policy to an existing paper. Returns None only when the
    /// target does not exist; a no-op policy returns the record unchanged.
    pub async fn merge_paper(
        &self,
        existing_id: i32,
        draft: &PaperDraft,
        mode: MergeMode,
        fields: &[String],
    ) -> Result<Option<PaperDetails>> {
        let Some(existing) = PaperEntity::find_by_id(existing_id)
            .one(self.write_conn())
            .await?
        else {
            return Ok(None);
        };

        let selected = selected_fields(mode, fields);
        if selected.is_empty() {
            return self.find_paper(existing_id).await;
        }

        if selected.contains(&MergeableField::Doi) {
            if let Some(doi) = normalized_doi(&draft.doi) {
                if self.doi_conflicts(&doi, Some(existing_id)).await? {
                    return Err(AppError::Duplicate {
                        message: format!("DOI {} already exists", doi),
                    });
                }
            }
        }
        if selected.contains(&MergeableField::VenueId) {
            if let Some(venue_id) = draft.venue_id {
                self.ensure_venue_exists(venue_id).await?;
            }
        }
        let author_ids = dedup_ids(&draft.author_ids);
        let tag_ids = dedup_ids(&draft.tag_ids);
        if selected.contains(&MergeableField::Authors) {
            self.ensure_authors_exist(&author_ids).await?;
        }
        if selected.contains(&MergeableField::Tags) {
            self.ensure_tags_exist(&tag_ids).await?;
        }

        let txn = self.write_conn().begin().await?;

        let mut model: paper::ActiveModel = existing.into();
        for field in &selected {
            match field {
                MergeableField::Title => {
                    let title = draft.title.trim();
                    if !title.is_empty() {
                        model.title = Set(title.to_string());
                    }
                }
                MergeableField::Abstract => model.abstract_text = Set(draft.abstract_text.clone()),
                MergeableField::PublicationYear => {
                    model.publication_year = Set(draft.publication_year)
                }
                MergeableField::Doi => model.doi = Set(normalized_doi(&draft.doi)),
                MergeableField::CitationCount => {
                    model.citation_count = Set(draft.citation_count.max(0))
                }
                MergeableField::VenueId => model.venue_id = Set(draft.venue_id),
                MergeableField::Keywords => model.keywords = Set(keywords_opt(&draft.keywords)),
                MergeableField::Url => model.url = Set(draft.url.clone()),
                MergeableField::Authors | MergeableField::Tags => {}
            }
        }
        model.updated_at = Set(Utc::now().into());
        model.update(&txn).await?;

        if selected.contains(&MergeableField::Authors) {
            Self::replace_author_links(&txn, existing_id, &author_ids).await?;
        }
        if selected.contains(&MergeableField::Tags) {
            Self::replace_tag_links(&txn, existing_id, &tag_ids).await?;
        }

        txn.commit().await?;

        tracing::info!(paper_id = existing_id, mode = ?mode, "Merge applied");

        self.find_paper(existing_id).await
    }

    // ========================================================================
    // Author Operations
    // ========================================================================

    pub async fn create_author(
        &self,
        name: String,
        email: Option<String>,
        affiliation: Option<String>,
    ) -> Result<Author> {
        if let Some(ref email) = email {
            let existing = AuthorEntity::find()
                .filter(author::Column::Email.eq(email.clone()))
                .one(self.read_conn())
                .await?;
            if existing.is_some() {
                return Err(AppError::Duplicate {
                    message: format!("author email {} already exists", email),
                });
            }
        }

        author::ActiveModel {
            name: Set(name),
            email: Set(email),
            affiliation: Set(affiliation),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    pub async fn list_authors(&self, offset: u64, limit: u64) -> Result<Vec<Author>> {
        AuthorEntity::find()
            .order_by_asc(author::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Look an author up by exact name, creating it on miss (import path)
    pub async fn get_or_create_author(&self, name: &str) -> Result<Author> {
        let name = name.trim();
        if let Some(found) = AuthorEntity::find()
            .filter(author::Column::Name.eq(name))
            .one(self.read_conn())
            .await?
        {
            return Ok(found);
        }

        author::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    // ========================================================================
    // Venue Operations
    // ========================================================================

    pub async fn create_venue(
        &self,
        name: String,
        kind: VenueKind,
        impact_factor: Option<rust_decimal::Decimal>,
    ) -> Result<Venue> {
        venue::ActiveModel {
            name: Set(name),
            kind: Set(kind),
            impact_factor: Set(impact_factor),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    pub async fn list_venues(&self) -> Result<Vec<Venue>> {
        VenueEntity::find()
            .order_by_asc(venue::Column::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Look a venue up by exact name, creating it on miss (import path)
    pub async fn get_or_create_venue(&self, name: &str, kind: VenueKind) -> Result<Venue> {
        let name = name.trim();
        if let Some(found) = VenueEntity::find()
            .filter(venue::Column::Name.eq(name))
            .one(self.read_conn())
            .await?
        {
            return Ok(found);
        }

        venue::ActiveModel {
            name: Set(name.to_string()),
            kind: Set(kind),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    // ========================================================================
    // Tag Operations
    // ========================================================================

    pub async fn create_tag(&self, name: String, color: Option<String>) -> Result<Tag> {
        let existing = TagEntity::find()
            .filter(tag::Column::Name.eq(name.clone()))
            .one(self.read_conn())
            .await?;
        if existing.is_some() {
            return Err(AppError::Duplicate {
                message: format!("tag {} already exists", name),
            });
        }

        tag::ActiveModel {
            name: Set(name),
            color: Set(color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string())),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        TagEntity::find()
            .order_by_asc(tag::Column::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Batch-attach tags to a paper. Existing pairs are left alone.
    pub async fn add_tags_to_paper(&self, paper_id: i32, tag_ids: &[i32]) -> Result<PaperDetails> {
        self.ensure_paper_exists(paper_id).await?;
        let tag_ids = dedup_ids(tag_ids);
        self.ensure_tags_exist(&tag_ids).await?;

        let txn = self.write_conn().begin().await?;
        for tag_id in &tag_ids {
            Self::link_tag(&txn, paper_id, *tag_id).await?;
        }
        txn.commit().await?;

        self.find_paper(paper_id)
            .await?
            .ok_or(AppError::PaperNotFound { id: paper_id })
    }

    /// Batch-detach tags from a paper
    pub async fn remove_tags_from_paper(
        &self,
        paper_id: i32,
        tag_ids: &[i32],
    ) -> Result<PaperDetails> {
        self.ensure_paper_exists(paper_id).await?;

        PaperTagEntity::delete_many()
            .filter(paper_tag::Column::PaperId.eq(paper_id))
            .filter(paper_tag::Column::TagId.is_in(tag_ids.to_vec()))
            .exec(self.write_conn())
            .await?;

        self.find_paper(paper_id)
            .await?
            .ok_or(AppError::PaperNotFound { id: paper_id })
    }

    // ========================================================================
    // Citation Operations
    // ========================================================================

    pub async fn create_citation(&self, citing_paper_id: i32, cited_paper_id: i32) -> Result<Citation> {
        self.ensure_paper_exists(citing_paper_id).await?;
        self.ensure_paper_exists(cited_paper_id).await?;

        citation::ActiveModel {
            citing_paper_id: Set(citing_paper_id),
            cited_paper_id: Set(cited_paper_id),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    /// Citations for a paper (outgoing, incoming)
    pub async fn citations_for_paper(&self, paper_id: i32) -> Result<(Vec<Citation>, Vec<Citation>)> {
        self.ensure_paper_exists(paper_id).await?;

        let outgoing = CitationEntity::find()
            .filter(citation::Column::CitingPaperId.eq(paper_id))
            .all(self.read_conn())
            .await?;
        let incoming = CitationEntity::find()
            .filter(citation::Column::CitedPaperId.eq(paper_id))
            .all(self.read_conn())
            .await?;

        Ok((outgoing, incoming))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn doi_conflicts(&self, doi: &str, exclude: Option<i32>) -> Result<bool> {
        let mut select = PaperEntity::find().filter(doi_ci_eq(doi));
        if let Some(id) = exclude {
            select = select.filter(paper::Column::Id.ne(id));
        }
        Ok(select.one(self.read_conn()).await?.is_some())
    }

    async fn ensure_paper_exists(&self, id: i32) -> Result<()> {
        PaperEntity::find_by_id(id)
            .one(self.read_conn())
            .await?
            .map(|_| ())
            .ok_or(AppError::PaperNotFound { id })
    }

    async fn ensure_venue_exists(&self, id: i32) -> Result<()> {
        VenueEntity::find_by_id(id)
            .one(self.read_conn())
            .await?
            .map(|_| ())
            .ok_or(AppError::VenueNotFound { id })
    }

    async fn ensure_authors_exist(&self, ids: &[i32]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let found: HashSet<i32> = AuthorEntity::find()
            .filter(author::Column::Id.is_in(ids.to_vec()))
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();
        match ids.iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(AppError::AuthorNotFound { id: *missing }),
            None => Ok(()),
        }
    }

    async fn ensure_tags_exist(&self, ids: &[i32]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let found: HashSet<i32> = TagEntity::find()
            .filter(tag::Column::Id.is_in(ids.to_vec()))
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        match ids.iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(AppError::TagNotFound { id: *missing }),
            None => Ok(()),
        }
    }

    /// Replace a paper's author links, assigning dense 1-based order from
    /// the submitted sequence. The per-pair existence check guards against
    /// concurrent editors re-adding a link between our delete and insert.
    async fn replace_author_links<C: ConnectionTrait>(
        conn: &C,
        paper_id: i32,
        author_ids: &[i32],
    ) -> Result<()> {
        PaperAuthorEntity::delete_many()
            .filter(paper_author::Column::PaperId.eq(paper_id))
            .exec(conn)
            .await?;

        for (index, author_id) in author_ids.iter().enumerate() {
            let already = PaperAuthorEntity::find()
                .filter(paper_author::Column::PaperId.eq(paper_id))
                .filter(paper_author::Column::AuthorId.eq(*author_id))
                .one(conn)
                .await?;
            if already.is_some() {
                continue;
            }

            paper_author::ActiveModel {
                paper_id: Set(paper_id),
                author_id: Set(*author_id),
                author_order: Set((index + 1) as i32),
                is_corresponding: Set(false),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }

        Ok(())
    }

    /// Replace a paper's tag links with the same defensive pair check
    async fn replace_tag_links<C: ConnectionTrait>(
        conn: &C,
        paper_id: i32,
        tag_ids: &[i32],
    ) -> Result<()> {
        PaperTagEntity::delete_many()
            .filter(paper_tag::Column::PaperId.eq(paper_id))
            .exec(conn)
            .await?;

        for tag_id in tag_ids {
            Self::link_tag(conn, paper_id, *tag_id).await?;
        }

        Ok(())
    }

    /// Attach one tag unless the pair already exists
    async fn link_tag<C: ConnectionTrait>(conn: &C, paper_id: i32, tag_id: i32) -> Result<()> {
        let already = PaperTagEntity::find()
            .filter(paper_tag::Column::PaperId.eq(paper_id))
            .filter(paper_tag::Column::TagId.eq(tag_id))
            .one(conn)
            .await?;
        if already.is_some() {
            return Ok(());
        }

        paper_tag::ActiveModel {
            paper_id: Set(paper_id),
            tag_id: Set(tag_id),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        Ok(())
    }

    /// Hydrate papers with venue, ordered authors and tags
    async fn load_details(&self, papers: Vec<Paper>) -> Result<Vec<PaperDetails>> {
        if papers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = papers.iter().map(|p| p.id).collect();

        let author_rows = PaperAuthorEntity::find()
            .filter(paper_author::Column::PaperId.is_in(ids.clone()))
            .find_also_related(AuthorEntity)
            .order_by_asc(paper_author::Column::AuthorOrder)
            .all(self.read_conn())
            .await?;

        let tag_rows = PaperTagEntity::find()
            .filter(paper_tag::Column::PaperId.is_in(ids))
            .find_also_related(TagEntity)
            .all(self.read_conn())
            .await?;

        let venue_ids: Vec<i32> = papers.iter().filter_map(|p| p.venue_id).collect();
        let venues: HashMap<i32, Venue> = if venue_ids.is_empty() {
            HashMap::new()
        } else {
            VenueEntity::find()
                .filter(venue::Column::Id.is_in(venue_ids))
                .all(self.read_conn())
                .await?
                .into_iter()
                .map(|v| (v.id, v))
                .collect()
        };

        let mut authors_by_paper: HashMap<i32, Vec<AuthorLink>> = HashMap::new();
        for (link, found) in author_rows {
            if let Some(found) = found {
                authors_by_paper
                    .entry(link.paper_id)
                    .or_default()
                    .push(AuthorLink {
                        author_order: link.author_order,
                        is_corresponding: link.is_corresponding,
                        author: found,
                    });
            }
        }

        let mut tags_by_paper: HashMap<i32, Vec<Tag>> = HashMap::new();
        for (link, found) in tag_rows {
            if let Some(found) = found {
                tags_by_paper.entry(link.paper_id).or_default().push(found);
            }
        }

        Ok(papers
            .into_iter()
            .map(|p| PaperDetails {
                venue: p.venue_id.and_then(|id| venues.get(&id).cloned()),
                authors: authors_by_paper.remove(&p.id).unwrap_or_default(),
                tags: tags_by_paper.remove(&p.id).unwrap_or_default(),
                paper: p,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::QueryTrait;
    use serde_json::json;

    fn cond(field: &str, operator: &str, value: serde_json::Value) -> FilterCondition {
        FilterCondition {
            id: None,
            field: field.to_string(),
            operator: operator.to_string(),
            value,
        }
    }

    fn sql_for(root: &FilterGroup) -> String {
        let (select, _) = build_complex_select(root).unwrap();
        select.build(DbBackend::Postgres).to_string()
    }

    #[test]
    fn test_dedup_ids_preserves_first_seen_order() {
        assert_eq!(dedup_ids(&[1, 1, 2]), vec![1, 2]);
        assert_eq!(dedup_ids(&[7, 5, 7, 5]), vec![7, 5]);
        assert!(dedup_ids(&[]).is_empty());
    }

    #[test]
    fn test_normalized_doi_trims_and_drops_blank() {
        assert_eq!(
            normalized_doi(&Some(" 10.1/X ".to_string())),
            Some("10.1/X".to_string())
        );
        assert_eq!(normalized_doi(&Some("   ".to_string())), None);
        assert_eq!(normalized_doi(&None), None);
    }

    #[test]
    fn test_keywords_opt_drops_blank_entries() {
        assert_eq!(keywords_opt(&[]), None);
        assert_eq!(keywords_opt(&["  ".to_string()]), None);
        assert_eq!(
            keywords_opt(&[" ml ".to_string(), "nlp".to_string()]),
            Some(vec!["ml".to_string(), "nlp".to_string()])
        );
    }

    #[test]
    fn test_doi_lookup_is_case_insensitive() {
        let sql = PaperEntity::find()
            .filter(doi_ci_eq("10.1/X"))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("LOWER"), "{}", sql);
        assert!(sql.contains("10.1/x"), "{}", sql);
    }

    #[test]
    fn test_complex_select_without_relations_has_no_joins() {
        let root = FilterGroup::all_of(vec![cond("year_from", "greater_equal", json!(2020))]);
        let sql = sql_for(&root);
        assert!(!sql.contains("JOIN"), "{}", sql);
        assert!(sql.contains("DISTINCT"), "{}", sql);
    }

    #[test]
    fn test_complex_select_adds_author_join_once() {
        // author_name referenced twice, at two depths
        let inner = FilterGroup::all_of(vec![cond("author_name", "contains", json!("curie"))]);
        let root = FilterGroup {
            conditions: vec![cond("author_name", "contains", json!("lovelace"))],
            groups: vec![inner],
            ..Default::default()
        };
        let sql = sql_for(&root);
        assert_eq!(sql.matches("INNER JOIN \"authors\"").count(), 1, "{}", sql);
        assert_eq!(sql.matches("INNER JOIN \"paper_authors\"").count(), 1, "{}", sql);
        assert!(!sql.contains("\"tags\""), "{}", sql);
    }

    #[test]
    fn test_complex_select_adds_tag_join() {
        let root = FilterGroup::all_of(vec![cond("tags", "in", json!(["ml"]))]);
        let sql = sql_for(&root);
        assert!(sql.contains("INNER JOIN \"paper_tags\""), "{}", sql);
        assert!(sql.contains("INNER JOIN \"tags\""), "{}", sql);
        assert!(sql.contains("DISTINCT"), "{}", sql);
    }

    #[test]
    fn test_simple_filters_lower_to_and_group() {
        let filters = SearchFilters {
            title_keyword: Some("transformer".to_string()),
            year_from: Some(2017),
            tags: Some(vec!["nlp".to_string()]),
            ..Default::default()
        };
        let root = filters.into_filter_group();
        assert_eq!(root.conditions.len(), 3);
        assert!(root.groups.is_empty());

        let sql = sql_for(&root);
        assert!(sql.contains(" AND "), "{}", sql);
        assert!(sql.contains("ILIKE"), "{}", sql);
        assert!(sql.contains("INNER JOIN \"tags\""), "{}", sql);
    }

    #[test]
    fn test_empty_simple_filters_compile_to_unfiltered_select() {
        let root = SearchFilters::default().into_filter_group();
        let sql = sql_for(&root);
        assert!(!sql.contains("WHERE"), "{}", sql);
    }
}
