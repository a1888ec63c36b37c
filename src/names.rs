//! Entity name -> storage name candidates.

/// Storage spellings an entity name may appear under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameCandidates {
    /// Trimmed name as typed, e.g. `Luna Blanca`.
    pub full: String,
    /// Text before the first space, e.g. `Luna`.
    pub first_token: String,
    /// Filesystem-safe name used for generated files, e.g. `luna_blanca`.
    pub base_name: String,
}

impl NameCandidates {
    /// Returns `None` for an empty or blank name.
    pub fn resolve(name: &str) -> Option<NameCandidates> {
        let full = name.trim();
        if full.is_empty() {
            return None;
        }

        let first_token = full.split_whitespace().next().unwrap_or(full);

        Some(NameCandidates {
            full: full.to_string(),
            first_token: first_token.to_string(),
            base_name: base_name(full),
        })
    }

    /// Folder names to try, most specific first, already lowercased and deduplicated.
    pub fn folder_candidates(&self) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::with_capacity(4);
        for candidate in [&self.full, &self.first_token, &self.base_name] {
            let lower = candidate.to_lowercase();
            if !lower.is_empty() && !candidates.contains(&lower) {
                candidates.push(lower);
            }
        }
        candidates
    }

    pub fn lowercase(&self) -> String {
        self.full.to_lowercase()
    }

    pub fn file_name(&self, seq: u32) -> String {
        format!("{}{}.jpg", self.base_name, seq)
    }
}

/// Accents stripped, anything outside `[a-z0-9]` replaced with `_`, lowercased.
pub fn base_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(fold_accent)
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        other => other,
    }
}
