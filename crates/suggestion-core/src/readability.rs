//! Reading difficulty estimate for mixed English/Korean prose.
//!
//! English text gets a Flesch-Kincaid grade from a vowel-group syllable
//! count. Korean text is bucketed by average words per sentence only. Both
//! land on a 1..=5 scale and are blended by the share of Hangul letters.

use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

const ENGLISH_GRADE_THRESHOLDS: [f64; 4] = [3.0, 6.0, 9.0, 12.0];
const KOREAN_WORDS_PER_SENTENCE_THRESHOLDS: [f64; 4] = [7.0, 10.0, 13.0, 16.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadabilityReport {
    pub sentences: usize,
    pub words: usize,
    pub syllables: usize,
    pub korean_ratio: f64,
    pub english_grade: f64,
    pub english_level: f64,
    pub korean_level: f64,
    /// Blended level in `1.0..=5.0`.
    pub score: f64,
}

pub fn score(text: &str) -> f64 {
    report(text).score
}

pub fn report(text: &str) -> ReadabilityReport {
    let words: Vec<&str> = text.unicode_words().collect();
    let sentences = count_sentences(text);
    let syllables: usize = words.iter().map(|w| syllables(w)).sum();

    let words_per_sentence = ratio(words.len(), sentences);
    let syllables_per_word = ratio(syllables, words.len());

    let english_grade = 0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59;
    let english_level = bucket(english_grade, &ENGLISH_GRADE_THRESHOLDS);
    let korean_level = bucket(words_per_sentence, &KOREAN_WORDS_PER_SENTENCE_THRESHOLDS);

    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    let hangul = text.chars().filter(|&c| is_hangul(c)).count();
    let korean_ratio = ratio(hangul, letters);

    ReadabilityReport {
        sentences,
        words: words.len(),
        syllables,
        korean_ratio,
        english_grade,
        english_level,
        korean_level,
        score: korean_level * korean_ratio + english_level * (1.0 - korean_ratio),
    }
}

/// `numerator / denominator`, with a zero denominator treated as 1.
fn ratio(numerator: usize, denominator: usize) -> f64 {
    numerator as f64 / denominator.max(1) as f64
}

fn bucket(value: f64, thresholds: &[f64]) -> f64 {
    1.0 + thresholds.iter().filter(|&&t| value >= t).count() as f64
}

pub fn is_hangul(c: char) -> bool {
    matches!(c,
        '\u{AC00}'..='\u{D7A3}'
        | '\u{1100}'..='\u{11FF}'
        | '\u{3130}'..='\u{318F}'
        | '\u{A960}'..='\u{A97F}'
        | '\u{D7B0}'..='\u{D7FF}')
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n' | '。' | '？' | '！' | '…')
}

/// Sentences that contain at least one word.
fn count_sentences(text: &str) -> usize {
    text.split(is_sentence_end)
        .filter(|s| s.unicode_words().next().is_some())
        .count()
}

/// Hangul blocks are one syllable each; other words use a vowel-group count.
fn syllables(word: &str) -> usize {
    let hangul = word.chars().filter(|&c| is_hangul(c)).count();
    if hangul > 0 {
        return hangul;
    }

    let lower = word.to_lowercase();
    let mut count = 0;
    let mut prev_vowel = false;
    for c in lower.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }
    if lower.ends_with('e') && !lower.ends_with("le") && count > 1 {
        count -= 1;
    }
    count.max(1)
}
