/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the password policy
/// - [`jwt`]: HS256 access/refresh tokens
/// - [`middleware`]: bearer-token extraction and the `AuthContext` extension
/// - [`authorization`]: the resource policy table
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::jwt::{create_token, Claims, TokenType};
/// use taskboard_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("S3cure!pass")?;
/// assert!(verify_password("S3cure!pass", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
