//! Single-source registry of the nine visual fields. SQL set-clause
//! generation, prompt assembly, API response parsing, embedding-text
//! composition, and merge-strategy dispatch all iterate this table so that
//! adding a field is a one-line edit here, nowhere else.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingGroup {
    Primary,
    Detail,
    Meta,
}

impl EmbeddingGroup {
    /// Separator used when joining this group's field values into the
    /// embedding text composition (spec §4.6).
    pub fn joiner(self) -> &'static str {
        match self {
            EmbeddingGroup::Primary => ". ",
            EmbeddingGroup::Detail | EmbeddingGroup::Meta => ", ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    PreferNonNil,
    PreferNonEmptyArray,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub column: &'static str,
    pub is_array: bool,
    pub include_in_tags: bool,
    pub group: EmbeddingGroup,
    pub merge_strategy: MergeStrategy,
    pub prompt_line: &'static str,
    pub display_label: &'static str,
}

pub const FIELDS: [FieldSpec; 9] = [
    FieldSpec {
        column: "scene",
        is_array: false,
        include_in_tags: false,
        group: EmbeddingGroup::Primary,
        merge_strategy: MergeStrategy::PreferNonNil,
        prompt_line: "Describe the overall scene in one short phrase.",
        display_label: "Scene",
    },
    FieldSpec {
        column: "subjects",
        is_array: true,
        include_in_tags: true,
        group: EmbeddingGroup::Primary,
        merge_strategy: MergeStrategy::PreferNonEmptyArray,
        prompt_line: "List the main subjects visible (people, animals, notable objects).",
        display_label: "Subjects",
    },
    FieldSpec {
        column: "actions",
        is_array: true,
        include_in_tags: true,
        group: EmbeddingGroup::Primary,
        merge_strategy: MergeStrategy::PreferNonEmptyArray,
        prompt_line: "List the actions or activities taking place.",
        display_label: "Actions",
    },
    FieldSpec {
        column: "objects",
        is_array: true,
        include_in_tags: true,
        group: EmbeddingGroup::Detail,
        merge_strategy: MergeStrategy::PreferNonEmptyArray,
        prompt_line: "List notable background objects.",
        display_label: "Objects",
    },
    FieldSpec {
        column: "mood",
        is_array: false,
        include_in_tags: true,
        group: EmbeddingGroup::Detail,
        merge_strategy: MergeStrategy::PreferNonNil,
        prompt_line: "Describe the mood or tone in one or two words.",
        display_label: "Mood",
    },
    FieldSpec {
        column: "shot_type",
        is_array: false,
        include_in_tags: true,
        group: EmbeddingGroup::Detail,
        merge_strategy: MergeStrategy::PreferNonNil,
        prompt_line: "Describe the camera shot type (e.g. close-up, wide shot).",
        display_label: "Shot type",
    },
    FieldSpec {
        column: "lighting",
        is_array: false,
        include_in_tags: false,
        group: EmbeddingGroup::Meta,
        merge_strategy: MergeStrategy::PreferNonNil,
        prompt_line: "Describe the lighting conditions.",
        display_label: "Lighting",
    },
    FieldSpec {
        column: "colors",
        is_array: true,
        include_in_tags: false,
        group: EmbeddingGroup::Meta,
        merge_strategy: MergeStrategy::PreferNonEmptyArray,
        prompt_line: "List the dominant colors.",
        display_label: "Colors",
    },
    FieldSpec {
        column: "description",
        is_array: false,
        include_in_tags: false,
        group: EmbeddingGroup::Primary,
        merge_strategy: MergeStrategy::PreferNonNil,
        prompt_line: "Write a one-sentence description of the clip.",
        display_label: "Description",
    },
];

pub fn field_by_column(column: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.column == column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_nine_fields() {
        assert_eq!(FIELDS.len(), 9);
    }

    #[test]
    fn columns_are_unique() {
        let mut cols: Vec<_> = FIELDS.iter().map(|f| f.column).collect();
        cols.sort_unstable();
        cols.dedup();
        assert_eq!(cols.len(), FIELDS.len());
    }

    #[test]
    fn lookup_by_column_works() {
        assert!(field_by_column("scene").is_some());
        assert!(field_by_column("nonexistent").is_none());
    }

    #[test]
    fn tag_fields_match_spec_subset() {
        let tag_cols: Vec<_> = FIELDS
            .iter()
            .filter(|f| f.include_in_tags)
            .map(|f| f.column)
            .collect();
        assert_eq!(
            tag_cols,
            vec!["subjects", "actions", "objects", "mood", "shot_type"]
        );
    }
}
