/// Reads a grammatical-evolution genotype one codon at a time, restarting from
/// the first codon when the end is reached. An empty genotype reads as zeros.
pub struct GeneConsumer<'a> {
    codons: &'a [u32],
    cursor: usize,
    wraps: usize,
}

impl<'a> GeneConsumer<'a> {
    pub fn new(codons: &'a [u32]) -> Self {
        Self {
            codons,
            cursor: 0,
            wraps: 0,
        }
    }

    pub fn consume(&mut self) -> u32 {
        let Some(&first) = self.codons.first() else {
            return 0;
        };
        let codon = match self.codons.get(self.cursor) {
            Some(&codon) => codon,
            None => {
                self.cursor = 0;
                self.wraps += 1;
                first
            }
        };
        self.cursor += 1;
        codon
    }

    /// Index into `options` alternatives. A single option reads no codon.
    pub fn choose(&mut self, options: usize) -> usize {
        match options {
            0 | 1 => 0,
            n => self.consume() as usize % n,
        }
    }

    /// Value in `min..=max`.
    pub fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let width = (max - min) as u64 + 1;
        min + (u64::from(self.consume()) % width) as i64
    }

    /// Value in `min..=max`, scaled linearly from the codon.
    pub fn float_range(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        let fraction = f64::from(self.consume()) / f64::from(u32::MAX);
        min + fraction * (max - min)
    }

    pub fn wraps(&self) -> usize {
        self.wraps
    }

    pub fn position(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_around() {
        let genome = [3, 4];
        let mut consumer = GeneConsumer::new(&genome);
        assert_eq!(consumer.consume(), 3);
        assert_eq!(consumer.consume(), 4);
        assert_eq!(consumer.consume(), 3);
        assert_eq!(consumer.wraps(), 1);
        assert_eq!(consumer.position(), 1);
    }

    #[test]
    fn test_ranges() {
        let genome = [7, u32::MAX, 0];
        let mut consumer = GeneConsumer::new(&genome);
        assert_eq!(consumer.choose(3), 1);
        assert_eq!(consumer.float_range(1.0, 2.0), 2.0);
        assert_eq!(consumer.int_range(5, 9), 5);
        assert_eq!(consumer.int_range(4, 4), 4);
    }

    #[test]
    fn test_empty_genome() {
        let mut consumer = GeneConsumer::new(&[]);
        assert_eq!(consumer.consume(), 0);
        assert_eq!(consumer.choose(5), 0);
    }
}
