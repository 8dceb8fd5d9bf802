/// Bump whenever `SEEDS` changes so stored libraries pick up the new set
pub const SEED_VERSION: u32 = 2;

/// (category, phrase, difficulty)
pub(super) const SEEDS: &[(&str, &str, u8)] = &[
    ("Animal", "A big brown dog", 1),
    ("Animal", "The cat is sleeping", 1),
    ("Animal", "An elephant never forgets", 3),
    ("Animal", "Busy as a bee", 2),
    ("Animal", "The early bird catches the worm", 4),
    ("Food", "Apple pie", 1),
    ("Food", "Chicken soup", 1),
    ("Food", "Peanut butter sandwich", 2),
    ("Food", "Spaghetti and meatballs", 3),
    ("Food", "A piece of cake", 2),
    ("Place", "The library", 1),
    ("Place", "The train station", 2),
    ("Place", "The Eiffel Tower", 2),
    ("Place", "Under the sea", 1),
    ("Place", "The Grand Canyon", 3),
    ("Thing", "A red umbrella", 1),
    ("Thing", "My homework", 1),
    ("Thing", "A cup of hot chocolate", 2),
    ("Thing", "The remote control", 3),
    ("Phrase", "Good morning", 1),
    ("Phrase", "See you later", 1),
    ("Phrase", "Practice makes perfect", 2),
    ("Phrase", "Better late than never", 3),
    ("Phrase", "Actions speak louder than words", 4),
    ("Phrase", "Break a leg", 3),
    ("Classroom", "Open your books", 1),
    ("Classroom", "Raise your hand", 1),
    ("Classroom", "Homework is due on Friday", 2),
    ("Classroom", "Please repeat the question", 3),
    ("Weather", "It is raining cats and dogs", 4),
    ("Weather", "A sunny day", 1),
    ("Weather", "Cloudy with a chance of rain", 3),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seeds_are_valid_and_unique() {
        let mut seen = HashSet::new();
        for (category, phrase, difficulty) in SEEDS {
            assert!(!category.trim().is_empty());
            assert!(phrase.chars().any(|c| c.is_ascii_alphabetic()), "{}", phrase);
            assert!((1..=4).contains(difficulty), "{}", phrase);
            assert!(seen.insert((category.to_uppercase(), phrase.to_uppercase())));
        }
    }
}
