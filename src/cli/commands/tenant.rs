use clap::Subcommand;

use crate::cli::utils::{output_rows, output_success};
use crate::cli::OutputFormat;
use crate::database::models::tenant::NewTenant;
use crate::services::TenantService;

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "List tenants")]
    List {
        #[arg(long, help = "Include trashed tenants")]
        all: bool,
    },

    #[command(about = "Provision a tenant database with a full-access admin user")]
    Create {
        #[arg(help = "Tenant name ([A-Za-z0-9_-], 2-100 chars)")]
        name: String,

        #[arg(long, help = "Human-readable name")]
        display_name: Option<String>,

        #[arg(long, help = "Login of the first administrator")]
        admin: String,

        #[arg(long, help = "Password of the first administrator")]
        password: String,
    },
}

pub async fn handle(cmd: TenantCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = TenantService::new().await?;

    match cmd {
        TenantCommands::List { all } => {
            let tenants = service.list_tenants(all).await?;
            output_rows(
                output_format,
                &tenants,
                &format!("{:<24} {:<30} {:<26} {}", "NAME", "DISPLAY NAME", "DATABASE", "ACTIVE"),
                |t| format!("{:<24} {:<30} {:<26} {}", t.name, t.display_name, t.database, t.is_active),
            )
        }
        TenantCommands::Create {
            name,
            display_name,
            admin,
            password,
        } => {
            let tenant = service
                .create_tenant(NewTenant {
                    name,
                    display_name,
                    admin_auth: admin,
                    admin_password: password,
                })
                .await?;
            output_success(
                output_format,
                &format!("Tenant '{}' created in database {}", tenant.name, tenant.database),
                &tenant,
            )
        }
    }
}
