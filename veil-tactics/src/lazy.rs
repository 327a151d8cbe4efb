#![forbid(unsafe_code)]

/// Row-major index odometer over a cross product: the last dimension
/// varies fastest, so the first choice point is the outermost loop.
/// Any zero-length dimension makes the product empty.
pub struct Odometer {
    dims: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl Odometer {
    pub fn new(dims: Vec<usize>) -> Self {
        let next = if dims.is_empty() || dims.iter().any(|&d| d == 0) {
            None
        } else {
            Some(vec![0; dims.len()])
        };
        Self { dims, next }
    }
}

impl Iterator for Odometer {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.clone()?;
        // advance, rolling over from the rightmost digit
        let mut i = self.dims.len();
        let mut digits = current.clone();
        loop {
            if i == 0 {
                self.next = None;
                break;
            }
            i -= 1;
            digits[i] += 1;
            if digits[i] < self.dims[i] {
                self.next = Some(digits);
                break;
            }
            digits[i] = 0;
        }
        Some(current)
    }
}
