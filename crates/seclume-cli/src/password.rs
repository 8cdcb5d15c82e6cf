//! Password policy and prompting.

use miette::{bail, IntoDiagnostic, Result};

/// Minimum length the strength policy accepts.
const MIN_LENGTH: usize = 8;

/// The password strength policy: at least [`MIN_LENGTH`] characters mixing
/// uppercase, lowercase, digits, and something else, unless `allow_weak`.
pub fn acceptable(password: &str, allow_weak: bool) -> bool {
	if allow_weak {
		return true;
	}
	if password.chars().count() < MIN_LENGTH {
		return false;
	}
	let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
	let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
	let has_digit = password.chars().any(|c| c.is_ascii_digit());
	let has_special = password.chars().any(|c| !c.is_ascii_alphanumeric());
	has_upper && has_lower && has_digit && has_special
}

/// Take the password from the flag, or prompt for it without echo.
///
/// `confirm` asks for it twice; used when creating an archive, where a typo
/// would be unrecoverable.
pub fn resolve(flag: Option<String>, confirm: bool) -> Result<String> {
	match flag {
		Some(password) => Ok(password),
		None => {
			let password =
				rpassword::prompt_password("Archive password: ").into_diagnostic()?;
			if confirm {
				let again =
					rpassword::prompt_password("Confirm password: ").into_diagnostic()?;
				if again != password {
					bail!("passwords do not match");
				}
			}
			Ok(password)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn policy_requires_all_character_classes() {
		assert!(acceptable("Correct_Horse1!", false));
		assert!(acceptable("Pw#Aaaa1!", false));

		// allow_weak bypasses everything
		assert!(acceptable("short", true));
		assert!(acceptable("", true));

		assert!(!acceptable("alllowercase1!", false));
		assert!(!acceptable("ALLUPPERCASE1!", false));
		assert!(!acceptable("NoDigitsHere!", false));
		assert!(!acceptable("NoSpecials11", false));
		assert!(!acceptable("Sh0rt!!", false));
	}
}
