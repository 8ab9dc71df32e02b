//! Iteration over IPv4 and TCP option lists.

const OPTION_END: u8 = 0;
const OPTION_NOP: u8 = 1;

/// One option from an IPv4 or TCP option list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderOption<'a> {
    pub kind: u8,
    /// Option body, without the kind and length bytes.
    pub data: &'a [u8],
}

/// Take the next option from `options`, advancing the slice past it.
///
/// Returns `None` at the end-of-list marker, at the end of the slice, or
/// when an option's length byte is invalid or runs past the slice. In every
/// `None` case the cursor is left empty.
///
/// # Examples
/// ```
/// use tracekit_core::next_option;
///
/// // NOP, then MSS = 1460.
/// let mut options: &[u8] = &[1, 2, 4, 0x05, 0xb4];
/// assert_eq!(next_option(&mut options).unwrap().kind, 1);
/// let mss = next_option(&mut options).unwrap();
/// assert_eq!((mss.kind, mss.data), (2, &[0x05, 0xb4][..]));
/// assert!(next_option(&mut options).is_none());
/// ```
pub fn next_option<'a>(options: &mut &'a [u8]) -> Option<HeaderOption<'a>> {
    let list = *options;
    let Some(&kind) = list.first() else {
        return None;
    };
    match kind {
        OPTION_END => {
            *options = &[];
            None
        }
        OPTION_NOP => {
            *options = &list[1..];
            Some(HeaderOption { kind, data: &[] })
        }
        _ => {
            let len = list.get(1).map(|len| usize::from(*len));
            match len {
                Some(len) if len >= 2 && len <= list.len() => {
                    *options = &list[len..];
                    Some(HeaderOption {
                        kind,
                        data: &list[2..len],
                    })
                }
                _ => {
                    *options = &[];
                    None
                }
            }
        }
    }
}
