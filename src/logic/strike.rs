use crate::data::PlayerId;

/// Decide whether the batsmen change ends after a delivery.
///
/// Odd runs swap the ends during play; the end of an over swaps them again, so on the
/// last ball of an over an even number of runs means a swap and an odd number cancels out.
pub fn should_rotate_strike(runs_run: u32, completes_over: bool) -> bool {
    let odd = runs_run % 2 == 1;
    if completes_over { !odd } else { odd }
}

/// Apply the rotation to a (striker, non-striker) pair.
pub fn rotate(striker: Option<PlayerId>, non_striker: Option<PlayerId>, rotate: bool) -> (Option<PlayerId>, Option<PlayerId>) {
    if rotate { (non_striker, striker) } else { (striker, non_striker) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_mid_over() {
        assert!(!should_rotate_strike(0, false));
        assert!(should_rotate_strike(1, false));
        assert!(!should_rotate_strike(2, false));
        assert!(should_rotate_strike(3, false));
        assert!(!should_rotate_strike(4, false));
    }

    #[test]
    fn test_rotation_end_of_over() {
        assert!(should_rotate_strike(0, true));
        assert!(!should_rotate_strike(1, true));
        assert!(should_rotate_strike(2, true));
        assert!(!should_rotate_strike(3, true));
        assert!(should_rotate_strike(6, true));
    }

    #[test]
    fn test_rotate_pair() {
        let (a, b) = (Some(PlayerId(1)), Some(PlayerId(2)));
        assert_eq!(rotate(a, b, true), (b, a));
        assert_eq!(rotate(a, b, false), (a, b));
        assert_eq!(rotate(None, b, true), (b, None));
    }
}
