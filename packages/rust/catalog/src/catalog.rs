//! The compiled catalog and its reload handle.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use chimei_shared::{Category, CatalogConfig, Result};

use crate::builtin::{KNOWN_COMPOUNDS, STOPWORDS, builtin_specs};
use crate::pattern::{Pattern, PatternGroup, PatternSpec};
use crate::screen::Screen;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable set of compiled patterns plus the lookup tables strategies need.
#[derive(Debug, Clone)]
pub struct Catalog {
    patterns: Vec<Pattern>,
    decompositions: HashMap<String, (String, String)>,
    stopwords: HashSet<String>,
    screen: Screen,
}

impl Catalog {
    /// The built-in catalog with no user additions.
    pub fn builtin() -> Result<Self> {
        Self::with_config(&CatalogConfig::default())
    }

    /// Built-in catalog extended by the `[catalog]` config section.
    ///
    /// Every pattern is compiled here; the first failure is returned as a
    /// `ChimeiError::Pattern` naming the offending entry.
    pub fn with_config(config: &CatalogConfig) -> Result<Self> {
        let mut specs = builtin_specs(&config.extra_famous_places);

        for custom in &config.patterns {
            let mut spec = PatternSpec::new(
                &custom.name,
                &custom.regex,
                custom.category,
                PatternGroup::Lexical,
            );
            if let Some(priority) = custom.priority {
                spec = spec.with_priority(priority);
            }
            if let Some(confidence) = custom.confidence {
                spec = spec.with_confidence(confidence);
            }
            spec.guarded = custom.guarded;
            specs.push(spec);
        }

        Self::from_specs(specs)
    }

    /// Compile an explicit spec list. Known-compound decompositions, the
    /// stoplist, and the plausibility screen are always included.
    pub fn from_specs(specs: Vec<PatternSpec>) -> Result<Self> {
        let patterns = specs
            .into_iter()
            .map(Pattern::compile)
            .collect::<Result<Vec<_>>>()?;

        let decompositions = KNOWN_COMPOUNDS
            .iter()
            .map(|(base, modifier)| {
                (
                    format!("{base}{modifier}"),
                    (base.to_string(), modifier.to_string()),
                )
            })
            .collect();

        let stopwords = STOPWORDS.iter().map(|w| w.to_string()).collect();

        Ok(Self {
            patterns,
            decompositions,
            stopwords,
            screen: Screen::builtin()?,
        })
    }

    /// All patterns, in catalog order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Patterns consumed by one strategy group, in catalog order.
    pub fn group(&self, group: PatternGroup) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter().filter(move |p| p.group() == group)
    }

    /// Base/modifier split of a known compound.
    pub fn decompose(&self, text: &str) -> Option<(&str, &str)> {
        self.decompositions
            .get(text)
            .map(|(base, modifier)| (base.as_str(), modifier.as_str()))
    }

    pub fn is_stopword(&self, text: &str) -> bool {
        self.stopwords.contains(text)
    }

    /// Whether a match from a screened pattern can stand as a place name.
    /// `after` is the sentence text following the match.
    pub fn is_plausible(&self, name: &str, category: Category, after: &str) -> bool {
        self.screen.admits(name, category, after)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CatalogHandle
// ---------------------------------------------------------------------------

/// Shared pointer to the current catalog.
///
/// Readers take a snapshot with [`current`](Self::current) and keep it for
/// the whole work; a reload swaps the pointer without touching snapshots
/// already handed out.
#[derive(Debug)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Snapshot of the current catalog.
    pub fn current(&self) -> Arc<Catalog> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new catalog, returning the previous one.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(catalog))
    }

    /// Compile a catalog from `config` and swap it in. On a compile error
    /// the current catalog stays in place.
    pub fn reload(&self, config: &CatalogConfig) -> Result<()> {
        let catalog = Catalog::with_config(config)?;
        let patterns = catalog.len();
        self.replace(catalog);
        info!(patterns, "pattern catalog reloaded");
        Ok(())
    }
}
