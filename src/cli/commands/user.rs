use clap::Subcommand;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::models::user::NewUser;
use crate::services::{TenantService, UserService};
use crate::types::AccessLevel;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user inside a tenant")]
    Create {
        #[arg(help = "Login name")]
        auth: String,

        #[arg(long, help = "Tenant name")]
        tenant: String,

        #[arg(long, help = "Display name (defaults to the login)")]
        name: Option<String>,

        #[arg(long)]
        password: String,

        #[arg(long, default_value = "read", help = "deny, read, edit or full")]
        access: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Create {
            auth,
            tenant,
            name,
            password,
            access,
        } => {
            let access: AccessLevel = access.parse()?;
            let pool = TenantService::new().await?.get_tenant_pool(&tenant).await?;
            let user = UserService::new(pool)
                .create(NewUser {
                    name: name.unwrap_or_else(|| auth.clone()),
                    auth,
                    password,
                    access: Some(access),
                })
                .await?;
            output_success(
                output_format,
                &format!("User '{}' created in tenant '{}' with {} access", user.auth, tenant, user.access),
                &user,
            )
        }
    }
}
