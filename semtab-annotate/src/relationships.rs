//! Known semantic relations between types
//!
//! Indexed by `(source, target)` pair and by relation name. A relation name
//! with no recorded pairs is compatible with any type.

use crate::mapping::TypeMappingTable;
use semtab_core::TypeRelationship;
use std::collections::HashMap;

const WD: &str = "http://www.wikidata.org/entity/";
const DBO: &str = "http://dbpedia.org/ontology/";

/// Built-in DBpedia relations: (source class, target class, name, confidence).
const BUILTIN_DBPEDIA: &[(&str, &str, &str, f64)] = &[
    ("Country", "City", "hasCapital", 0.9),
    ("City", "Country", "capitalOf", 0.8),
    ("City", "Country", "locatedIn", 0.8),
    ("Settlement", "Country", "country", 0.8),
    ("Town", "Country", "country", 0.75),
    ("Village", "Country", "country", 0.7),
    ("Mountain", "Country", "locatedIn", 0.7),
    ("River", "Country", "country", 0.7),
    ("Airport", "City", "city", 0.75),
    ("University", "City", "city", 0.75),
    ("Stadium", "City", "location", 0.7),
    ("Country", "Continent", "continent", 0.8),
    ("Country", "Currency", "currency", 0.85),
    ("Country", "Language", "officialLanguage", 0.85),
    ("Person", "City", "birthPlace", 0.7),
    ("Person", "Country", "nationality", 0.7),
    ("Politician", "PoliticalParty", "party", 0.8),
    ("Politician", "Country", "nationality", 0.7),
    ("Film", "Person", "director", 0.8),
    ("Film", "Actor", "starring", 0.8),
    ("TelevisionShow", "Actor", "starring", 0.75),
    ("Book", "Writer", "author", 0.85),
    ("Book", "Person", "author", 0.7),
    ("WrittenWork", "Writer", "author", 0.8),
    ("SoccerPlayer", "SoccerClub", "team", 0.85),
    ("SoccerClub", "Stadium", "ground", 0.7),
    ("SoccerClub", "City", "location", 0.7),
    ("Company", "City", "headquarter", 0.75),
    ("Company", "Country", "country", 0.7),
    ("Album", "Band", "artist", 0.8),
    ("Album", "MusicalArtist", "artist", 0.8),
    ("Song", "Band", "artist", 0.75),
];

/// Built-in Wikidata relations over class ids.
const BUILTIN_WIKIDATA: &[(&str, &str, &str, f64)] = &[
    ("Q6256", "Q515", "hasCapital", 0.9),
    ("Q515", "Q6256", "capitalOf", 0.8),
    ("Q515", "Q6256", "country", 0.8),
    ("Q6256", "Q8142", "currency", 0.85),
    ("Q6256", "Q34770", "officialLanguage", 0.85),
    ("Q6256", "Q5107", "continent", 0.8),
    ("Q5", "Q515", "birthPlace", 0.7),
    ("Q5", "Q6256", "nationality", 0.7),
    ("Q11424", "Q5", "director", 0.8),
    ("Q571", "Q5", "author", 0.75),
    ("Q937857", "Q476028", "team", 0.85),
    ("Q482994", "Q215380", "artist", 0.8),
];

/// Indexed relationship dataset.
#[derive(Debug, Clone, Default)]
pub struct TypeRelationshipTable {
    relationships: Vec<TypeRelationship>,
    by_pair: HashMap<(String, String), Vec<usize>>,
    by_name: HashMap<String, Vec<usize>>,
}

impl TypeRelationshipTable {
    /// Index caller-supplied relationships. Exact duplicates are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = TypeRelationship>) -> Self {
        let mut table = Self::default();
        for relationship in entries {
            if table.relationships.contains(&relationship) {
                continue;
            }
            let index = table.relationships.len();
            table
                .by_pair
                .entry((
                    relationship.source_type.clone(),
                    relationship.target_type.clone(),
                ))
                .or_default()
                .push(index);
            table
                .by_name
                .entry(relationship.relation_name.clone())
                .or_default()
                .push(index);
            table.relationships.push(relationship);
        }
        table
    }

    /// The built-in dataset, in both vocabularies.
    pub fn builtin() -> Self {
        let dbpedia = BUILTIN_DBPEDIA.iter().map(|(s, t, name, c)| {
            TypeRelationship::new(format!("{DBO}{s}"), format!("{DBO}{t}"), *name, *c)
        });
        let wikidata = BUILTIN_WIKIDATA.iter().map(|(s, t, name, c)| {
            TypeRelationship::new(format!("{WD}{s}"), format!("{WD}{t}"), *name, *c)
        });
        Self::from_entries(dbpedia.chain(wikidata))
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// Relations recorded from `source_type` to `target_type`.
    pub fn between(
        &self,
        source_type: &str,
        target_type: &str,
    ) -> impl Iterator<Item = &TypeRelationship> {
        self.by_pair
            .get(&(source_type.to_string(), target_type.to_string()))
            .into_iter()
            .flatten()
            .map(|&i| &self.relationships[i])
    }

    /// Every recorded pair for one relation name.
    pub fn named(&self, relation_name: &str) -> impl Iterator<Item = &TypeRelationship> {
        self.by_name
            .get(relation_name)
            .into_iter()
            .flatten()
            .map(|&i| &self.relationships[i])
    }

    /// Whether `local_type` can sit at its end of a relation.
    ///
    /// `local_is_source` says which end the local column is on; when
    /// `related_type` is known the recorded pair must match it too. Types
    /// match a recorded end directly or through an equivalence in
    /// `mappings`, so a pair recorded in one vocabulary accepts candidates
    /// expressed in the other.
    pub fn is_compatible(
        &self,
        mappings: &TypeMappingTable,
        relation_name: Option<&str>,
        local_type: &str,
        related_type: Option<&str>,
        local_is_source: bool,
    ) -> bool {
        let Some(name) = relation_name else {
            return true;
        };
        let mut pairs = self.named(name).peekable();
        if pairs.peek().is_none() {
            return true;
        }
        let matches = |recorded: &str, candidate: &str| {
            recorded == candidate || mappings.are_equivalent(candidate, recorded)
        };
        pairs.any(|rel| {
            let (local_end, related_end) = if local_is_source {
                (&rel.source_type, &rel.target_type)
            } else {
                (&rel.target_type, &rel.source_type)
            };
            matches(local_end, local_type)
                && related_type.map_or(true, |r| matches(related_end, r))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dbo(class: &str) -> String {
        format!("{DBO}{class}")
    }

    #[test]
    fn test_builtin_pair_lookup() {
        let table = TypeRelationshipTable::builtin();
        let found: Vec<_> = table.between(&dbo("Country"), &dbo("City")).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].relation_name, "hasCapital");
        assert!(table.between(&dbo("City"), &dbo("Film")).next().is_none());
    }

    #[test]
    fn test_builtin_covers_both_vocabularies() {
        let table = TypeRelationshipTable::builtin();
        let names: Vec<_> = table.named("hasCapital").collect();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_compatibility_checks_the_right_end() {
        let table = TypeRelationshipTable::builtin();
        let exact = TypeMappingTable::default();
        let (country, city, film) = (dbo("Country"), dbo("City"), dbo("Film"));
        let check = |local: &str, related: &str, local_is_source| {
            table.is_compatible(&exact, Some("hasCapital"), local, Some(related), local_is_source)
        };

        assert!(check(country.as_str(), city.as_str(), true));
        assert!(check(city.as_str(), country.as_str(), false));
        assert!(!check(city.as_str(), country.as_str(), true));
        assert!(!check(country.as_str(), film.as_str(), true));
    }

    #[test]
    fn test_related_type_unknown_checks_local_end_only() {
        let table = TypeRelationshipTable::builtin();
        let exact = TypeMappingTable::default();
        assert!(table.is_compatible(&exact, Some("hasCapital"), &dbo("City"), None, false));
        assert!(!table.is_compatible(&exact, Some("hasCapital"), &dbo("Film"), None, false));
    }

    #[test]
    fn test_unknown_relations_are_compatible() {
        let table = TypeRelationshipTable::builtin();
        let exact = TypeMappingTable::default();
        let city = dbo("City");
        assert!(table.is_compatible(&exact, Some("twinnedWith"), &dbo("Film"), None, true));
        assert!(table.is_compatible(&exact, None, &dbo("Film"), Some(city.as_str()), false));
    }

    #[test]
    fn test_pair_recorded_in_other_vocabulary_matches_through_mappings() {
        let table = TypeRelationshipTable::from_entries(vec![TypeRelationship::new(
            format!("{WD}Q515"),
            format!("{WD}Q6256"),
            "country",
            0.8,
        )]);
        let mappings = TypeMappingTable::builtin();
        let exact = TypeMappingTable::default();
        let (city, country) = (dbo("City"), dbo("Country"));
        let check = |mappings: &TypeMappingTable, local: &str, related: &str, local_is_source| {
            table.is_compatible(mappings, Some("country"), local, Some(related), local_is_source)
        };

        assert!(check(&mappings, city.as_str(), country.as_str(), true));
        assert!(check(&mappings, country.as_str(), city.as_str(), false));
        assert!(!check(&mappings, country.as_str(), city.as_str(), true));
        assert!(!check(&exact, city.as_str(), country.as_str(), true));
    }

    #[test]
    fn test_from_entries_drops_duplicates() {
        let rel = TypeRelationship::new(dbo("A"), dbo("B"), "r", 0.5);
        let table = TypeRelationshipTable::from_entries(vec![rel.clone(), rel]);
        assert_eq!(table.len(), 1);
    }
}
