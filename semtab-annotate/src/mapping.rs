//! Wikidata / DBpedia type equivalences
//!
//! The table is indexed from both sides at construction, so a lookup by
//! either a Wikidata class or a DBpedia class is a single hash lookup.

use semtab_core::{KnowledgeBase, TypeMapping};
use std::collections::HashMap;

const WD: &str = "http://www.wikidata.org/entity/";
const DBO: &str = "http://dbpedia.org/ontology/";

/// Built-in equivalences: (Wikidata id, DBpedia class, confidence, note).
const BUILTIN: &[(&str, &str, f64, &str)] = &[
    ("Q5", "Person", 0.95, "human"),
    ("Q6256", "Country", 0.95, "country"),
    ("Q3624078", "Country", 0.9, "sovereign state"),
    ("Q515", "City", 0.95, "city"),
    ("Q1549591", "City", 0.85, "big city"),
    ("Q5119", "City", 0.8, "capital city"),
    ("Q486972", "Settlement", 0.9, "human settlement"),
    ("Q532", "Village", 0.9, "village"),
    ("Q3957", "Town", 0.9, "town"),
    ("Q10864048", "AdministrativeRegion", 0.8, "first-level administrative division"),
    ("Q35657", "AdministrativeRegion", 0.8, "U.S. state"),
    ("Q5107", "Continent", 0.95, "continent"),
    ("Q2221906", "Place", 0.8, "geographic location"),
    ("Q8502", "Mountain", 0.95, "mountain"),
    ("Q4022", "River", 0.95, "river"),
    ("Q23397", "Lake", 0.95, "lake"),
    ("Q23442", "Island", 0.95, "island"),
    ("Q1248784", "Airport", 0.95, "airport"),
    ("Q41176", "Building", 0.9, "building"),
    ("Q12280", "Bridge", 0.95, "bridge"),
    ("Q483110", "Stadium", 0.95, "stadium"),
    ("Q33506", "Museum", 0.95, "museum"),
    ("Q16917", "Hospital", 0.9, "hospital"),
    ("Q43229", "Organisation", 0.9, "organization"),
    ("Q4830453", "Company", 0.9, "business"),
    ("Q783794", "Company", 0.9, "company"),
    ("Q3918", "University", 0.95, "university"),
    ("Q7278", "PoliticalParty", 0.95, "political party"),
    ("Q476028", "SoccerClub", 0.95, "association football club"),
    ("Q12973014", "SportsTeam", 0.9, "sports team"),
    ("Q215380", "Band", 0.9, "musical group"),
    ("Q11424", "Film", 0.95, "film"),
    ("Q5398426", "TelevisionShow", 0.9, "television series"),
    ("Q482994", "Album", 0.95, "album"),
    ("Q7366", "Song", 0.9, "song"),
    ("Q571", "Book", 0.9, "book"),
    ("Q7725634", "WrittenWork", 0.85, "literary work"),
    ("Q7889", "VideoGame", 0.95, "video game"),
    ("Q7397", "Software", 0.9, "software"),
    ("Q34770", "Language", 0.9, "language"),
    ("Q8142", "Currency", 0.95, "currency"),
    ("Q16521", "Species", 0.8, "taxon"),
    ("Q82955", "Politician", 0.9, "politician"),
    ("Q937857", "SoccerPlayer", 0.95, "association football player"),
    ("Q33999", "Actor", 0.9, "actor"),
    ("Q36180", "Writer", 0.9, "writer"),
    ("Q639669", "MusicalArtist", 0.85, "musician"),
];

/// One equivalence found for a type URI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equivalent<'a> {
    /// Position of the mapping in the table.
    pub index: usize,
    /// Knowledge base of the URI that was looked up.
    pub from: KnowledgeBase,
    /// The counterpart type URI.
    pub uri: &'a str,
    pub confidence: f64,
}

impl Equivalent<'_> {
    /// Knowledge base of the counterpart type.
    pub fn to(&self) -> KnowledgeBase {
        self.from.other()
    }
}

/// Bidirectional, indexed type mapping table.
#[derive(Debug, Clone, Default)]
pub struct TypeMappingTable {
    mappings: Vec<TypeMapping>,
    by_wikidata: HashMap<String, Vec<usize>>,
    by_dbpedia: HashMap<String, Vec<usize>>,
}

impl TypeMappingTable {
    /// Index caller-supplied mappings. Exact duplicates are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = TypeMapping>) -> Self {
        let mut table = Self::default();
        for mapping in entries {
            if table.mappings.contains(&mapping) {
                continue;
            }
            let index = table.mappings.len();
            table
                .by_wikidata
                .entry(mapping.wikidata_type.clone())
                .or_default()
                .push(index);
            table
                .by_dbpedia
                .entry(mapping.dbpedia_type.clone())
                .or_default()
                .push(index);
            table.mappings.push(mapping);
        }
        table
    }

    /// The built-in dataset of common classes.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN.iter().map(|(qid, class, confidence, note)| {
            TypeMapping::new(format!("{WD}{qid}"), format!("{DBO}{class}"), *confidence)
                .with_description(*note)
        }))
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeMapping> {
        self.mappings.iter()
    }

    /// Every equivalence of `type_uri`, looked up from either side.
    pub fn equivalents<'a>(&'a self, type_uri: &str) -> Vec<Equivalent<'a>> {
        let mut found = Vec::new();
        for (from, index) in [
            (KnowledgeBase::Wikidata, &self.by_wikidata),
            (KnowledgeBase::DbPedia, &self.by_dbpedia),
        ] {
            let Some(positions) = index.get(type_uri) else {
                continue;
            };
            for &position in positions {
                let mapping = &self.mappings[position];
                found.push(Equivalent {
                    index: position,
                    from,
                    uri: mapping.type_for(from.other()),
                    confidence: mapping.confidence,
                });
            }
        }
        found
    }

    /// Equivalences of `type_uri` expressed in `target`'s vocabulary.
    pub fn equivalents_in<'a>(
        &'a self,
        type_uri: &str,
        target: KnowledgeBase,
    ) -> impl Iterator<Item = Equivalent<'a>> {
        self.equivalents(type_uri)
            .into_iter()
            .filter(move |eq| eq.to() == target)
    }

    /// Whether `a` and `b` are recorded as equivalent.
    pub fn are_equivalent(&self, a: &str, b: &str) -> bool {
        self.equivalents(a).iter().any(|eq| eq.uri == b)
    }
}
