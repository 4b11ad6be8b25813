use crate::error::{ClipError, Result};

/// Silence threshold (dB below average loudness) used for every reciter
pub const DEFAULT_SILENCE_THRESHOLD: f64 = 8.0;

/// A reciter available on quran.com
#[derive(Debug, Clone, PartialEq)]
pub struct Reciter {
    pub name: &'static str,
    /// quran.com recitation id
    pub id: u32,
    /// dB below the recitation's average loudness that counts as silence
    pub silence_threshold: f64,
}

const RECITERS: &[(&str, u32)] = &[
    ("AbdulBaset AbdulSamad", 1),
    ("Abdur-Rahman as-Sudais", 2),
    ("Abu Bakr al-Shatri", 3),
    ("Hani ar-Rifai", 4),
    ("Mahmoud Khalil Al-Husary", 5),
    ("Mishari Rashid al-`Afasy", 6),
    ("Mohamed Siddiq al-Minshawi", 7),
    ("Sa'ud ash-Shuraim", 8),
    ("Khalifah Al Tunaiji", 11),
    ("Sa'ad al-Ghamdi", 12),
    ("Yasser Ad Dussary", 20),
    ("Ahmed ibn Ali al-Ajmy", 22),
    ("Abdullah Ali Jabir", 23),
    ("Bandar Baleela", 24),
    ("Maher al-Muaiqly", 25),
    ("Abdullah Hamad Abu Sharida", 26),
];

/// Look up a reciter by its exact name
pub fn find(name: &str) -> Result<Reciter> {
    RECITERS
        .iter()
        .find(|(reciter, _)| *reciter == name)
        .map(|&(name, id)| Reciter {
            name,
            id,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
        })
        .ok_or_else(|| ClipError::UnknownReciter(name.to_string()))
}

/// All supported reciters in recitation id order
pub fn list() -> Vec<Reciter> {
    RECITERS
        .iter()
        .map(|&(name, id)| Reciter {
            name,
            id,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_reciter() {
        let reciter = find("Hani ar-Rifai").unwrap();
        assert_eq!(reciter.id, 4);
        assert_eq!(reciter.silence_threshold, 8.0);
    }

    #[test]
    fn test_find_unknown_reciter() {
        let err = find("Nobody").unwrap_err();
        assert!(matches!(err, ClipError::UnknownReciter(name) if name == "Nobody"));
    }

    #[test]
    fn test_list_is_sorted_by_id() {
        let ids: Vec<u32> = list().iter().map(|r| r.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 16);
    }
}
